//! Typed structured-data hashing for off-line unstake authorizations.
//!
//! A wallet signs `keccak256(0x19 0x01 || domain_separator || struct_hash)` with
//! its secp256k1 key. The domain binds the digest to this pool contract on this
//! network, the per-user nonce makes every signature usable exactly once.

use soroban_sdk::{crypto::Hash, log, xdr::ToXdr, Address, Bytes, BytesN, Env};

use crate::{error::ContractError, storage::get_signer, unstake::UnstakeRequest};

const DOMAIN_TYPE: &[u8] =
    b"Domain(string name,string version,bytes32 networkId,address verifyingContract)";
const DOMAIN_NAME: &[u8] = b"Insurance Pool";
const DOMAIN_VERSION: &[u8] = b"1";
const UNSTAKE_TYPE: &[u8] =
    b"UnstakeRequest(address user,uint64 positionId,uint64 deadline,uint64 nonce)";

/// Order of the secp256k1 group, big-endian.
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];
/// `CURVE_ORDER / 2`, the largest `s` of a normalized signature.
const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

fn keccak(env: &Env, data: &Bytes) -> Bytes {
    env.crypto().keccak256(data).to_bytes().into()
}

fn keccak_slice(env: &Env, data: &[u8]) -> Bytes {
    keccak(env, &Bytes::from_slice(env, data))
}

pub fn domain_separator(env: &Env) -> Bytes {
    let mut data = keccak_slice(env, DOMAIN_TYPE);
    data.append(&keccak_slice(env, DOMAIN_NAME));
    data.append(&keccak_slice(env, DOMAIN_VERSION));
    data.append(&env.ledger().network_id().into());
    data.append(&env.current_contract_address().to_xdr(env));

    keccak(env, &data)
}

fn unstake_struct_hash(
    env: &Env,
    user: &Address,
    position_id: u64,
    deadline: u64,
    nonce: u64,
) -> Bytes {
    let mut data = keccak_slice(env, UNSTAKE_TYPE);
    data.append(&user.clone().to_xdr(env));
    data.extend_from_array(&position_id.to_be_bytes());
    data.extend_from_array(&deadline.to_be_bytes());
    data.extend_from_array(&nonce.to_be_bytes());

    keccak(env, &data)
}

/// Digest the owner of `position_id` signs to let a keeper exit it on their behalf.
pub fn unstake_digest(
    env: &Env,
    user: &Address,
    position_id: u64,
    deadline: u64,
    nonce: u64,
) -> Hash<32> {
    let mut data = Bytes::from_array(env, &[0x19, 0x01]);
    data.append(&domain_separator(env));
    data.append(&unstake_struct_hash(env, user, position_id, deadline, nonce));

    env.crypto().keccak256(&data)
}

/// `r` in `[1, n - 1]` and `s` in `[1, n / 2]`.
///
/// Host recovery traps on scalars outside that range, which would abort the
/// whole call instead of rejecting one request.
fn is_well_formed(signature: &BytesN<64>) -> bool {
    let signature = signature.to_array();
    let (r, s) = signature.split_at(32);
    let zero = [0u8; 32];

    r != &zero[..] && r < &CURVE_ORDER[..] && s != &zero[..] && s <= &HALF_CURVE_ORDER[..]
}

/// Checks that `request` was signed by the key registered for its user, for the given nonce.
pub fn verify_unstake(
    env: &Env,
    request: &UnstakeRequest,
    nonce: u64,
) -> Result<(), ContractError> {
    let Some(signer) = get_signer(env, &request.user) else {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: No signer registered for {}",
            request.user
        );
        return Err(ContractError::InvalidSignature);
    };
    // ids 2 and 3 only occur for an `r` reduced modulo the order, which no signer produces
    if request.recovery_id > 1 {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Recovery id {} out of range",
            request.recovery_id
        );
        return Err(ContractError::InvalidSignature);
    }

    if !is_well_formed(&request.signature) {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Malformed signature for position {}",
            request.position_id
        );
        return Err(ContractError::InvalidSignature);
    }

    let digest = unstake_digest(
        env,
        &request.user,
        request.position_id,
        request.deadline,
        nonce,
    );
    let recovered: BytesN<65> =
        env.crypto()
            .secp256k1_recover(&digest, &request.signature, request.recovery_id);
    if recovered != signer {
        log!(
            env,
            "Insurance Pool: Scheduled unstake: Signature for position {} does not match the registered signer",
            request.position_id
        );
        return Err(ContractError::InvalidSignature);
    }

    Ok(())
}
