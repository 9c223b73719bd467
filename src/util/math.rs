/// Round `x` up to a multiple of `n`, which must be a power of two.
pub const fn roundup(x: usize, n: usize) -> usize {
    assert!(n.is_power_of_two());
    (x + n - 1) & !(n - 1)
}

/// Round `x` down to a multiple of `n`, which must be a power of two.
pub const fn rounddown(x: usize, n: usize) -> usize {
    assert!(n.is_power_of_two());
    x & !(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(roundup(0, 64), 0);
        assert_eq!(roundup(1, 64), 64);
        assert_eq!(roundup(64, 64), 64);
        assert_eq!(roundup(4000, 64), 4032);

        assert_eq!(rounddown(500, 8), 496);
        assert_eq!(rounddown(7, 8), 0);
        assert_eq!(rounddown(512, 32), 512);
    }
}
