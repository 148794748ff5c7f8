use super::*;

#[test]
fn reshape_keeps_allocation_and_clears() {
    let mut b = PixelBuffer::new(4, 4);
    b.fill([1, 2, 3, 4]);
    let ptr = b.data().as_ptr();
    b.reshape(2, 3);
    assert_eq!(b.size(), Size::new(2, 3));
    assert_eq!(b.data().len(), 24);
    assert!(b.data().iter().all(|&v| v == 0));
    assert_eq!(b.data().as_ptr(), ptr);
    assert!(b.capacity_bytes() >= 64);
}

#[test]
fn pixel_access_is_bounds_checked() {
    let mut b = PixelBuffer::new(2, 2);
    b.data_mut()[12..16].copy_from_slice(&[9, 8, 7, 255]);
    assert_eq!(b.pixel(1, 1), Some([9, 8, 7, 255]));
    assert_eq!(b.pixel(2, 0), None);
    assert_eq!(b.pixel(0, 2), None);
}

#[test]
fn from_premul_checks_length() {
    assert!(PixelBuffer::from_premul(2, 1, vec![0; 8]).is_some());
    assert!(PixelBuffer::from_premul(2, 1, vec![0; 7]).is_none());
}

#[test]
fn straight_export_unpremultiplies() {
    let b = PixelBuffer::from_premul(1, 1, vec![64, 0, 0, 128]).unwrap();
    assert_eq!(b.to_straight_rgba(), vec![128, 0, 0, 128]);
    let img = b.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [128, 0, 0, 128]);
}

#[test]
fn copy_from_requires_same_size() {
    let mut a = PixelBuffer::new(1, 1);
    let mut b = PixelBuffer::new(1, 1);
    b.fill([1, 1, 1, 1]);
    assert!(a.copy_from(&b));
    assert_eq!(a, b);
    assert!(!a.copy_from(&PixelBuffer::new(2, 1)));
}
