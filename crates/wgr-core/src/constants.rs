//! Protocol-wide constants for the Wagerr header chain.

/// Length in bytes of a 32-byte hash.
pub const HASH32_LEN: usize = 32;

/// Number of headers in one retarget chunk.
pub const CHUNK_SIZE: u64 = 2016;

/// Serialized size of a header without any optional trailing field.
pub const BASE_HEADER_SIZE: usize = 80;

/// Length of the accumulator checkpoint appended during the zerocoin era.
pub const ACC_CHECKPOINT_LEN: usize = 32;

/// Serialized size of a header carrying an accumulator checkpoint.
pub const CHECKPOINT_HEADER_SIZE: usize = BASE_HEADER_SIZE + ACC_CHECKPOINT_LEN;

/// Lowest header version that carries an accumulator checkpoint.
pub const CHECKPOINT_HEADER_VERSION: u32 = 4;

/// Lowest header version of the v7 layout.
pub const V7_HEADER_VERSION: u32 = 7;

/// First serialized byte that selects the legacy Quark proof-of-work hash.
///
/// Every other leading byte hashes with double SHA-256.
pub const LEGACY_POW_MARKER: u8 = 0x01;

/// Genesis hash of mainnet (display order).
pub const MAINNET_GENESIS: &str =
    "000007b9191bc7a17bfb6cedf96a8dacebb5730b498361bf26d44a9f9dcc1079";

/// Genesis hash of testnet (display order).
pub const TESTNET_GENESIS: &str =
    "00000fdc268f54ff1368703792dc046b1356e60914c2b5b6348032144bcb2de5";

/// Genesis hash of regtest (display order).
pub const REGTEST_GENESIS: &str =
    "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";

/// Genesis hash of simnet (display order).
pub const SIMNET_GENESIS: &str =
    "683e86bd5c6d110d91b94b97137ba6bfe02dbbdb8e3dff722a669b5d69d77af6";

/// First mainnet height whose header carries an accumulator checkpoint.
pub const MAINNET_CHECKPOINT_ERA_START: u64 = 1_002;

/// First mainnet height of the v7 header layout.
pub const MAINNET_V7_ERA_START: u64 = 1_501_000;

/// Serialized size of a v7 header on mainnet.
pub const MAINNET_V7_HEADER_SIZE: usize = 112;
