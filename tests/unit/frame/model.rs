use super::*;

fn frame(x: i32, y: i32, w: u32, h: u32) -> FrameDescriptor {
    FrameDescriptor {
        index: 0,
        x,
        y,
        width: w,
        height: h,
        duration_ms: 50,
        disposal: Disposal::None,
        blend: Blend::Over,
        payload: FramePayload::Still,
    }
}

#[test]
fn fits_checks_both_axes() {
    let canvas = Size::new(100, 100);
    assert!(frame(0, 0, 100, 100).fits(canvas));
    assert!(frame(50, 50, 50, 50).fits(canvas));
    assert!(!frame(51, 0, 50, 10).fits(canvas));
    assert!(!frame(0, 60, 10, 41).fits(canvas));
    assert!(!frame(-1, 0, 10, 10).fits(canvas));
}

#[test]
fn still_info_is_one_full_canvas_frame() {
    let info = AnimationInfo::still(Format::WebP, Size::new(7, 9));
    assert!(!info.animated);
    assert_eq!(info.loop_count, 1);
    assert_eq!(info.frame_count(), 1);
    assert_eq!(info.frames[0].rect(), IntRect::new(0, 0, 7, 9));
    assert!(matches!(info.frames[0].payload, FramePayload::Still));
    assert_eq!(info.total_duration_ms(), u64::from(DEFAULT_FRAME_DURATION_MS));
}

#[test]
fn info_serializes_to_json() {
    let info = AnimationInfo::still(Format::Gif, Size::new(1, 2));
    let v = serde_json::to_value(&info).unwrap();
    assert_eq!(v["format"], "gif");
    assert_eq!(v["viewport"]["height"], 2);
    assert_eq!(v["frames"][0]["payload"]["kind"], "still");
    assert_eq!(v["frames"][0]["disposal"], "none");
}
