use super::*;

#[test]
fn mul_div255_identities() {
    for x in [0u8, 1, 64, 128, 254, 255] {
        assert_eq!(mul_div255(x, 255), x);
        assert_eq!(mul_div255(x, 0), 0);
    }
}

#[test]
fn mul_div255_rounds_to_nearest() {
    // 128 * 128 / 255 = 64.25
    assert_eq!(mul_div255(128, 128), 64);
    // 255 * 127 / 255 = 127, 200 * 100 / 255 = 78.43
    assert_eq!(mul_div255(255, 127), 127);
    assert_eq!(mul_div255(200, 100), 78);
}
