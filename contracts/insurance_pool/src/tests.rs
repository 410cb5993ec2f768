mod join;
mod setup;
mod slash;
