use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(255, 128), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
}

#[test]
fn floor_pow2_picks_largest_power_not_above() {
    assert_eq!(floor_pow2(0), 1);
    assert_eq!(floor_pow2(1), 1);
    assert_eq!(floor_pow2(3), 2);
    assert_eq!(floor_pow2(4), 4);
    assert_eq!(floor_pow2(7), 4);
    assert_eq!(floor_pow2(1025), 1024);
}

#[test]
fn premultiply_zeroes_transparent_color() {
    let mut px = [200, 100, 50, 0, 255, 128, 0, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, [0, 0, 0, 0, 128, 64, 0, 128]);
}

#[test]
fn unpremultiply_restores_opaque_and_half() {
    let mut px = [10, 20, 30, 255, 64, 32, 0, 128];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[10, 20, 30, 255]);
    assert_eq!(px[4], 128);
    assert_eq!(px[5], 64);
}
