// Consensus-critical. Changes require test vector updates.
//! Quark: the legacy proof-of-work hash.
//!
//! Nine 512-bit rounds over BLAKE, BMW, Groestl, JH, Keccak and Skein, three
//! of which pick their function from bit 3 of the previous digest. The
//! result is the first 32 bytes of the final digest.
//!
//! Groestl, JH, Keccak and Skein come from RustCrypto. BLAKE-512 (the SHA-3
//! finalist, not BLAKE2) and BMW-512 have no maintained crate and live here.

use digest::consts::U64;
use digest::Digest;
use groestl::Groestl512;
use jh::Jh512;
use sha3::Keccak512;
use skein::Skein512;

type Digest512 = [u8; 64];

/// Compute the Quark hash of `data`, returned in wire order.
pub fn quark_hash(data: &[u8]) -> [u8; 32] {
    let h = blake512(data);
    let h = bmw512(&h);
    let h = if selects_first(&h) {
        rustcrypto::<Groestl512>(&h)
    } else {
        rustcrypto::<Skein512<U64>>(&h)
    };
    let h = rustcrypto::<Groestl512>(&h);
    let h = rustcrypto::<Jh512>(&h);
    let h = if selects_first(&h) {
        blake512(&h)
    } else {
        bmw512(&h)
    };
    let h = rustcrypto::<Keccak512>(&h);
    let h = rustcrypto::<Skein512<U64>>(&h);
    let h = if selects_first(&h) {
        rustcrypto::<Keccak512>(&h)
    } else {
        rustcrypto::<Jh512>(&h)
    };

    let mut out = [0u8; 32];
    out.copy_from_slice(&h[..32]);
    out
}

fn selects_first(h: &Digest512) -> bool {
    h[0] & 8 != 0
}

fn rustcrypto<D: Digest>(data: &[u8]) -> Digest512 {
    let mut out = [0u8; 64];
    out.copy_from_slice(&D::digest(data));
    out
}

// --- BLAKE-512 ---

const BLAKE_IV: [u64; 8] = [
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
    0x510e_527f_ade6_82d1,
    0x9b05_688c_2b3e_6c1f,
    0x1f83_d9ab_fb41_bd6b,
    0x5be0_cd19_137e_2179,
];

const BLAKE_C: [u64; 16] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
    0x4528_21e6_38d0_1377,
    0xbe54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd,
    0x3f84_d5b5_b547_0917,
    0x9216_d5d9_8979_fb1b,
    0xd131_0ba6_98df_b5ac,
    0x2ffd_72db_d01a_dfb7,
    0xb8e1_afed_6a26_7e96,
    0xba7c_9045_f12c_7f99,
    0x24a1_9947_b391_6cf7,
    0x0801_f2e2_858e_fc16,
    0x6369_20d8_7157_4e69,
];

const BLAKE_SIGMA: [[usize; 16]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
];

const BLAKE_BLOCK: usize = 128;

fn blake512(data: &[u8]) -> Digest512 {
    let mut h = BLAKE_IV;
    let total_bits = (data.len() as u128) * 8;

    let mut chunks = data.chunks_exact(BLAKE_BLOCK);
    let mut counted: u128 = 0;
    for block in chunks.by_ref() {
        counted += (BLAKE_BLOCK as u128) * 8;
        let mut buf = [0u8; BLAKE_BLOCK];
        buf.copy_from_slice(block);
        blake_compress(&mut h, &buf, counted);
    }

    // The counter of a block holding no message bits is zero.
    let tail = chunks.remainder();
    let mut buf = [0u8; BLAKE_BLOCK];
    buf[..tail.len()].copy_from_slice(tail);
    buf[tail.len()] = 0x80;
    let tail_counter = if tail.is_empty() { 0 } else { total_bits };
    if tail.len() < 112 {
        buf[111] |= 0x01;
        buf[112..].copy_from_slice(&total_bits.to_be_bytes());
        blake_compress(&mut h, &buf, tail_counter);
    } else {
        blake_compress(&mut h, &buf, tail_counter);
        let mut last = [0u8; BLAKE_BLOCK];
        last[111] = 0x01;
        last[112..].copy_from_slice(&total_bits.to_be_bytes());
        blake_compress(&mut h, &last, 0);
    }

    let mut out = [0u8; 64];
    for (i, word) in h.iter().enumerate() {
        out[i * 8..i * 8 + 8].copy_from_slice(&word.to_be_bytes());
    }
    out
}

fn blake_compress(h: &mut [u64; 8], block: &[u8; BLAKE_BLOCK], counter: u128) {
    let mut m = [0u64; 16];
    for (i, word) in m.iter_mut().enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(&block[i * 8..i * 8 + 8]);
        *word = u64::from_be_bytes(b);
    }

    let t0 = counter as u64;
    let t1 = (counter >> 64) as u64;
    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..12].copy_from_slice(&BLAKE_C[..4]);
    v[12] = t0 ^ BLAKE_C[4];
    v[13] = t0 ^ BLAKE_C[5];
    v[14] = t1 ^ BLAKE_C[6];
    v[15] = t1 ^ BLAKE_C[7];

    for round in 0..16 {
        let s = &BLAKE_SIGMA[round % 10];
        blake_g(&mut v, &m, s, [0, 4, 8, 12], 0);
        blake_g(&mut v, &m, s, [1, 5, 9, 13], 2);
        blake_g(&mut v, &m, s, [2, 6, 10, 14], 4);
        blake_g(&mut v, &m, s, [3, 7, 11, 15], 6);
        blake_g(&mut v, &m, s, [0, 5, 10, 15], 8);
        blake_g(&mut v, &m, s, [1, 6, 11, 12], 10);
        blake_g(&mut v, &m, s, [2, 7, 8, 13], 12);
        blake_g(&mut v, &m, s, [3, 4, 9, 14], 14);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

fn blake_g(v: &mut [u64; 16], m: &[u64; 16], s: &[usize; 16], idx: [usize; 4], i: usize) {
    let [a, b, c, d] = idx;
    v[a] = v[a]
        .wrapping_add(v[b])
        .wrapping_add(m[s[i]] ^ BLAKE_C[s[i + 1]]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(25);
    v[a] = v[a]
        .wrapping_add(v[b])
        .wrapping_add(m[s[i + 1]] ^ BLAKE_C[s[i]]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(11);
}

// --- BMW-512 ---

const BMW_IV: [u64; 16] = [
    0x8081_8283_8485_8687,
    0x8889_8a8b_8c8d_8e8f,
    0x9091_9293_9495_9697,
    0x9899_9a9b_9c9d_9e9f,
    0xa0a1_a2a3_a4a5_a6a7,
    0xa8a9_aaab_acad_aeaf,
    0xb0b1_b2b3_b4b5_b6b7,
    0xb8b9_babb_bcbd_bebf,
    0xc0c1_c2c3_c4c5_c6c7,
    0xc8c9_cacb_cccd_cecf,
    0xd0d1_d2d3_d4d5_d6d7,
    0xd8d9_dadb_dcdd_dedf,
    0xe0e1_e2e3_e4e5_e6e7,
    0xe8e9_eaeb_eced_eeef,
    0xf0f1_f2f3_f4f5_f6f7,
    0xf8f9_fafb_fcfd_feff,
];

const BMW_BLOCK: usize = 128;

/// Signs and indices of the five `M ^ H` terms of each `W` word.
const BMW_W: [[(i8, usize); 5]; 16] = [
    [(1, 5), (-1, 7), (1, 10), (1, 13), (1, 14)],
    [(1, 6), (-1, 8), (1, 11), (1, 14), (-1, 15)],
    [(1, 0), (1, 7), (1, 9), (-1, 12), (1, 15)],
    [(1, 0), (-1, 1), (1, 8), (-1, 10), (1, 13)],
    [(1, 1), (1, 2), (1, 9), (-1, 11), (-1, 14)],
    [(1, 3), (-1, 2), (1, 10), (-1, 12), (1, 15)],
    [(1, 4), (-1, 0), (-1, 3), (-1, 11), (1, 13)],
    [(1, 1), (-1, 4), (-1, 5), (-1, 12), (-1, 14)],
    [(1, 2), (-1, 5), (-1, 6), (1, 13), (-1, 15)],
    [(1, 0), (-1, 3), (1, 6), (-1, 7), (1, 14)],
    [(1, 8), (-1, 1), (-1, 4), (-1, 7), (1, 15)],
    [(1, 8), (-1, 0), (-1, 2), (-1, 5), (1, 9)],
    [(1, 1), (1, 3), (-1, 6), (-1, 9), (1, 10)],
    [(1, 2), (1, 4), (1, 7), (1, 10), (1, 11)],
    [(1, 3), (-1, 5), (1, 8), (-1, 11), (-1, 12)],
    [(1, 12), (-1, 4), (-1, 6), (-1, 9), (1, 13)],
];

fn bmw512(data: &[u8]) -> Digest512 {
    let mut h = BMW_IV;
    let total_bits = (data.len() as u64).wrapping_mul(8);

    let mut chunks = data.chunks_exact(BMW_BLOCK);
    for block in chunks.by_ref() {
        h = bmw_compress(&h, &le_words(block));
    }

    let tail = chunks.remainder();
    let mut buf = [0u8; BMW_BLOCK];
    buf[..tail.len()].copy_from_slice(tail);
    buf[tail.len()] = 0x80;
    if tail.len() >= BMW_BLOCK - 8 {
        h = bmw_compress(&h, &le_words(&buf));
        buf = [0u8; BMW_BLOCK];
    }
    buf[BMW_BLOCK - 8..].copy_from_slice(&total_bits.to_le_bytes());
    h = bmw_compress(&h, &le_words(&buf));

    let mut final_h = [0u64; 16];
    for (i, word) in final_h.iter_mut().enumerate() {
        *word = 0xaaaa_aaaa_aaaa_aaa0 + i as u64;
    }
    let h = bmw_compress(&final_h, &h);

    let mut out = [0u8; 64];
    for (i, word) in h[8..].iter().enumerate() {
        out[i * 8..i * 8 + 8].copy_from_slice(&word.to_le_bytes());
    }
    out
}

fn le_words(block: &[u8]) -> [u64; 16] {
    let mut m = [0u64; 16];
    for (i, word) in m.iter_mut().enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(&block[i * 8..i * 8 + 8]);
        *word = u64::from_le_bytes(b);
    }
    m
}

fn bmw_s(i: usize, x: u64) -> u64 {
    match i {
        0 => (x >> 1) ^ (x << 3) ^ x.rotate_left(4) ^ x.rotate_left(37),
        1 => (x >> 1) ^ (x << 2) ^ x.rotate_left(13) ^ x.rotate_left(43),
        2 => (x >> 2) ^ (x << 1) ^ x.rotate_left(19) ^ x.rotate_left(53),
        3 => (x >> 2) ^ (x << 2) ^ x.rotate_left(28) ^ x.rotate_left(59),
        4 => (x >> 1) ^ x,
        _ => (x >> 2) ^ x,
    }
}

const BMW_R: [u32; 7] = [5, 11, 27, 32, 37, 43, 53];

fn bmw_add_element(m: &[u64; 16], h: &[u64; 16], j: usize) -> u64 {
    let rot = |k: usize| m[k % 16].rotate_left((k % 16) as u32 + 1);
    let k_j = (j as u64).wrapping_mul(0x0555_5555_5555_5555);
    (rot(j - 16)
        .wrapping_add(rot(j - 13))
        .wrapping_sub(rot(j - 6))
        .wrapping_add(k_j))
        ^ h[(j - 16 + 7) % 16]
}

fn bmw_compress(h: &[u64; 16], m: &[u64; 16]) -> [u64; 16] {
    let mut q = [0u64; 32];

    // f0
    for (i, terms) in BMW_W.iter().enumerate() {
        let w = terms.iter().fold(0u64, |acc, &(sign, k)| {
            let t = m[k] ^ h[k];
            if sign > 0 {
                acc.wrapping_add(t)
            } else {
                acc.wrapping_sub(t)
            }
        });
        q[i] = bmw_s(i % 5, w).wrapping_add(h[(i + 1) % 16]);
    }

    // f1: two expand1 rounds, fourteen expand2 rounds.
    for j in 16..18 {
        let mut acc = bmw_add_element(m, h, j);
        for k in 0..16 {
            let s = match k % 4 {
                0 => 1,
                1 => 2,
                2 => 3,
                _ => 0,
            };
            acc = acc.wrapping_add(bmw_s(s, q[j - 16 + k]));
        }
        q[j] = acc;
    }
    for j in 18..32 {
        let mut acc = bmw_add_element(m, h, j);
        for k in 0..14 {
            let x = q[j - 16 + k];
            let term = if k % 2 == 0 { x } else { x.rotate_left(BMW_R[k / 2]) };
            acc = acc.wrapping_add(term);
        }
        acc = acc
            .wrapping_add(bmw_s(4, q[j - 2]))
            .wrapping_add(bmw_s(5, q[j - 1]));
        q[j] = acc;
    }

    // f2
    let xl = q[16..24].iter().fold(0u64, |a, x| a ^ x);
    let xh = q[24..32].iter().fold(xl, |a, x| a ^ x);

    let mut out = [0u64; 16];
    out[0] = ((xh << 5) ^ (q[16] >> 5) ^ m[0]).wrapping_add(xl ^ q[24] ^ q[0]);
    out[1] = ((xh >> 7) ^ (q[17] << 8) ^ m[1]).wrapping_add(xl ^ q[25] ^ q[1]);
    out[2] = ((xh >> 5) ^ (q[18] << 5) ^ m[2]).wrapping_add(xl ^ q[26] ^ q[2]);
    out[3] = ((xh >> 1) ^ (q[19] << 5) ^ m[3]).wrapping_add(xl ^ q[27] ^ q[3]);
    out[4] = ((xh >> 3) ^ q[20] ^ m[4]).wrapping_add(xl ^ q[28] ^ q[4]);
    out[5] = ((xh << 6) ^ (q[21] >> 6) ^ m[5]).wrapping_add(xl ^ q[29] ^ q[5]);
    out[6] = ((xh >> 4) ^ (q[22] << 6) ^ m[6]).wrapping_add(xl ^ q[30] ^ q[6]);
    out[7] = ((xh >> 11) ^ (q[23] << 2) ^ m[7]).wrapping_add(xl ^ q[31] ^ q[7]);

    out[8] = out[4]
        .rotate_left(9)
        .wrapping_add(xh ^ q[24] ^ m[8])
        .wrapping_add((xl << 8) ^ q[23] ^ q[8]);
    out[9] = out[5]
        .rotate_left(10)
        .wrapping_add(xh ^ q[25] ^ m[9])
        .wrapping_add((xl >> 6) ^ q[16] ^ q[9]);
    out[10] = out[6]
        .rotate_left(11)
        .wrapping_add(xh ^ q[26] ^ m[10])
        .wrapping_add((xl << 6) ^ q[17] ^ q[10]);
    out[11] = out[7]
        .rotate_left(12)
        .wrapping_add(xh ^ q[27] ^ m[11])
        .wrapping_add((xl << 4) ^ q[18] ^ q[11]);
    out[12] = out[0]
        .rotate_left(13)
        .wrapping_add(xh ^ q[28] ^ m[12])
        .wrapping_add((xl >> 3) ^ q[19] ^ q[12]);
    out[13] = out[1]
        .rotate_left(14)
        .wrapping_add(xh ^ q[29] ^ m[13])
        .wrapping_add((xl >> 4) ^ q[20] ^ q[13]);
    out[14] = out[2]
        .rotate_left(15)
        .wrapping_add(xh ^ q[30] ^ m[14])
        .wrapping_add((xl >> 7) ^ q[21] ^ q[14]);
    out[15] = out[3]
        .rotate_left(16)
        .wrapping_add(xh ^ q[31] ^ m[15])
        .wrapping_add((xl >> 2) ^ q[22] ^ q[15]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake512_empty_vector() {
        assert_eq!(
            hex::encode(blake512(b"")),
            "a8cfbbd73726062df0c6864dda65defe58ef0cc52a5625090fa17601e1eecd1b\
             628e94f396ae402a00acc9eab77b4d4c2e852aaaa25a636d80af3fc7913ef5b8"
        );
    }

    #[test]
    fn quark_is_deterministic_and_input_sensitive() {
        let mut raw = [0u8; 80];
        raw[0] = 0x01;
        let a = quark_hash(&raw);
        assert_eq!(a, quark_hash(&raw));
        raw[79] = 1;
        assert_ne!(a, quark_hash(&raw));
    }

    #[test]
    fn padding_paths_cover_block_edges() {
        // Lengths around the single-block padding limit take different branches.
        let outputs: Vec<_> = [0usize, 111, 112, 127, 128, 129]
            .iter()
            .map(|&n| (blake512(&vec![0xabu8; n]), bmw512(&vec![0xabu8; n])))
            .collect();
        for (i, a) in outputs.iter().enumerate() {
            for b in &outputs[i + 1..] {
                assert_ne!(a.0, b.0);
                assert_ne!(a.1, b.1);
            }
        }
    }
}
