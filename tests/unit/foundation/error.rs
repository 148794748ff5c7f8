use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FrameSeqError::invalid_signature("x")
            .to_string()
            .contains("invalid signature:")
    );
    assert!(
        FrameSeqError::malformed("x")
            .to_string()
            .contains("malformed chunk:")
    );
    assert!(
        FrameSeqError::decode("x")
            .to_string()
            .contains("raster decode error:")
    );
}

#[test]
fn out_of_bounds_names_the_chunk() {
    let err = FrameSeqError::OutOfChunkBounds {
        tag: FourCC(*b"fcTL"),
        offset: 33,
        length: 20,
        consumed: 26,
    };
    let msg = err.to_string();
    assert!(msg.contains("fcTL"));
    assert!(msg.contains("33"));
}

#[test]
fn classification_splits_recoverable_from_fatal() {
    assert!(FrameSeqError::malformed("crc").is_recoverable());
    assert!(
        FrameSeqError::OutOfChunkBounds {
            tag: FourCC(*b"ANMF"),
            offset: 0,
            length: 0,
            consumed: 1,
        }
        .is_recoverable()
    );

    let truncated = FrameSeqError::Truncated {
        offset: 10,
        needed: 4,
        available: 1,
    };
    assert!(truncated.is_fatal());
    assert!(!truncated.is_recoverable());
    assert!(!FrameSeqError::invalid_signature("x").is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FrameSeqError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
