mod tests {
    use embassy_time::Instant;
    use glowworm_light::math8::{beat8, beatsin8, blend8, scale8, sin8};

    #[test]
    fn test_scale8() {
        assert_eq!(scale8(255, 128), 128);
        assert_eq!(scale8(0, 128), 0);
        assert_eq!(scale8(128, 128), 64);
        assert_eq!(scale8(128, 255), 128);
        assert_eq!(scale8(128, 0), 0);
    }

    #[test]
    fn test_blend8() {
        assert_eq!(blend8(255, 128, 128), 191);
        assert_eq!(blend8(0, 128, 255), 128);
        assert_eq!(blend8(255, 0, 128), 127);
        assert_eq!(blend8(255, 128, 0), 255);
    }

    #[test]
    fn test_sin8() {
        assert_eq!(sin8(0), 128);
        assert_eq!(sin8(64), 255);
        assert_eq!(sin8(192), 0);
    }

    #[test]
    fn test_beat8() {
        assert_eq!(beat8(60, Instant::from_millis(0)), 0);
        assert_eq!(beat8(60, Instant::from_millis(500)), 128);
        // One beat per second wraps back to zero
        assert_eq!(beat8(60, Instant::from_millis(1000)), 0);
    }

    #[test]
    fn test_beatsin8_stays_in_range() {
        for ms in (0..60_000).step_by(37) {
            let value = beatsin8(10, 1, 4, Instant::from_millis(ms));
            assert!((1..=4).contains(&value), "{} out of range at {} ms", value, ms);
        }
        assert_eq!(beatsin8(10, 7, 7, Instant::from_millis(1234)), 7);
    }
}
