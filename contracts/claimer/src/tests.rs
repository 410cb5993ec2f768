mod voting;
