/// OpenCL C for both kernel variants.
///
/// `mine_nonce` writes one 41-byte record per lane (found, big-endian nonce,
/// digest). `mine_nonce_midstate` resumes from a host-computed midstate and
/// reports only the lowest hit lane through `atomic_min`.
pub const NONCE_KERNELS: &str = r#"
#define MAX_MESSAGE_LEN 2048
#define MAX_NONCE_DIGITS 20
#define RECORD_SIZE 41

__constant uint K[64] = {
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2
};

#define ROTR(x, n) rotate((x), (uint)(32 - (n)))
#define CH(x, y, z) bitselect((z), (y), (x))
#define MAJ(x, y, z) bitselect((x), (y), ((z) ^ (x)))
#define BSIG0(x) (ROTR(x, 2) ^ ROTR(x, 13) ^ ROTR(x, 22))
#define BSIG1(x) (ROTR(x, 6) ^ ROTR(x, 11) ^ ROTR(x, 25))
#define SSIG0(x) (ROTR(x, 7) ^ ROTR(x, 18) ^ ((x) >> 3))
#define SSIG1(x) (ROTR(x, 17) ^ ROTR(x, 19) ^ ((x) >> 10))

void sha256_compress(uint *state, const uchar *block) {
    uint w[64];
    for (int i = 0; i < 16; i++) {
        w[i] = ((uint)block[4 * i] << 24) | ((uint)block[4 * i + 1] << 16)
             | ((uint)block[4 * i + 2] << 8) | (uint)block[4 * i + 3];
    }
    for (int i = 16; i < 64; i++) {
        w[i] = SSIG1(w[i - 2]) + w[i - 7] + SSIG0(w[i - 15]) + w[i - 16];
    }

    uint a = state[0], b = state[1], c = state[2], d = state[3];
    uint e = state[4], f = state[5], g = state[6], h = state[7];

    for (int i = 0; i < 64; i++) {
        uint t1 = h + BSIG1(e) + CH(e, f, g) + K[i] + w[i];
        uint t2 = BSIG0(a) + MAJ(a, b, c);
        h = g; g = f; f = e; e = d + t1;
        d = c; c = b; b = a; a = t1 + t2;
    }

    state[0] += a; state[1] += b; state[2] += c; state[3] += d;
    state[4] += e; state[5] += f; state[6] += g; state[7] += h;
}

/* Hash `len` bytes of `msg` on top of `state`; `total_len` counts any prefix
   already absorbed into `state`. */
void sha256_finish(uint *state, const uchar *msg, int len, ulong total_len, uchar *out) {
    uchar block[64];
    int off = 0;

    while (len - off >= 64) {
        for (int i = 0; i < 64; i++) block[i] = msg[off + i];
        sha256_compress(state, block);
        off += 64;
    }

    int rem = len - off;
    for (int i = 0; i < 64; i++) block[i] = 0;
    for (int i = 0; i < rem; i++) block[i] = msg[off + i];
    block[rem] = 0x80;
    if (rem >= 56) {
        sha256_compress(state, block);
        for (int i = 0; i < 64; i++) block[i] = 0;
    }

    ulong bits = total_len * 8;
    for (int i = 0; i < 8; i++) block[63 - i] = (uchar)(bits >> (8 * i));
    sha256_compress(state, block);

    for (int i = 0; i < 8; i++) {
        out[4 * i] = (uchar)(state[i] >> 24);
        out[4 * i + 1] = (uchar)(state[i] >> 16);
        out[4 * i + 2] = (uchar)(state[i] >> 8);
        out[4 * i + 3] = (uchar)state[i];
    }
}

uint leading_zero_bits(const uchar *digest) {
    uint n = 0;
    for (int i = 0; i < 32; i++) {
        if (digest[i] == 0) {
            n += 8;
        } else {
            n += clz((uint)digest[i]) - 24;
            break;
        }
    }
    return n;
}

int fits_width(ulong nonce, int digits) {
    if (digits <= 0 || digits > MAX_NONCE_DIGITS) return 0;
    if (digits == MAX_NONCE_DIGITS) return 1;
    ulong limit = 1;
    for (int i = 0; i < digits; i++) limit *= 10;
    return nonce < limit;
}

void render_nonce(uchar *buf, int offset, int digits, ulong nonce) {
    for (int i = digits - 1; i >= 0; i--) {
        buf[offset + i] = (uchar)('0' + (nonce % 10));
        nonce /= 10;
    }
}

__kernel void mine_nonce(
    __global const uchar *input,
    const int len,
    const int nonce_offset,
    const int difficulty,
    const uint base_lo,
    const uint base_hi,
    __global uchar *results,
    const int digits
) {
    size_t lane = get_global_id(0);
    __global uchar *record = results + lane * RECORD_SIZE;
    record[0] = 0;

    ulong base = ((ulong)base_hi << 32) | (ulong)base_lo;
    ulong nonce = base + (ulong)lane;
    if (nonce < base) return;
    if (len > MAX_MESSAGE_LEN || nonce_offset < 0 || nonce_offset + digits > len) return;
    if (!fits_width(nonce, digits)) return;

    uchar work[MAX_MESSAGE_LEN];
    for (int i = 0; i < len; i++) work[i] = input[i];
    render_nonce(work, nonce_offset, digits, nonce);

    uint state[8] = {
        0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
        0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19
    };
    uchar digest[32];
    sha256_finish(state, work, len, (ulong)len, digest);

    if (leading_zero_bits(digest) < (uint)difficulty) return;

    record[0] = 1;
    for (int i = 0; i < 8; i++) record[1 + i] = (uchar)(nonce >> (56 - 8 * i));
    for (int i = 0; i < 32; i++) record[9 + i] = digest[i];
}

__kernel void mine_nonce_midstate(
    __global const uchar *tail,
    const int tail_len,
    const int prefix_len,
    __global const uint *midstate,
    const int nonce_offset,
    const int difficulty,
    const uint base_lo,
    const uint base_hi,
    const int digits,
    __global volatile uint *found_lane
) {
    uint lane = (uint)get_global_id(0);

    ulong base = ((ulong)base_hi << 32) | (ulong)base_lo;
    ulong nonce = base + (ulong)lane;
    if (nonce < base) return;
    if (prefix_len + tail_len > MAX_MESSAGE_LEN || nonce_offset < 0 || nonce_offset + digits > tail_len) return;
    if (!fits_width(nonce, digits)) return;

    uchar work[MAX_MESSAGE_LEN];
    for (int i = 0; i < tail_len; i++) work[i] = tail[i];
    render_nonce(work, nonce_offset, digits, nonce);

    uint state[8];
    for (int i = 0; i < 8; i++) state[i] = midstate[i];
    uchar digest[32];
    sha256_finish(state, work, tail_len, (ulong)(prefix_len + tail_len), digest);

    if (leading_zero_bits(digest) >= (uint)difficulty) {
        atomic_min(found_lane, lane);
    }
}
"#;
