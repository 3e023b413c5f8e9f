mod tests {
    use embassy_time::{Duration, Instant};
    use glowworm_light::color::Rgb;
    use glowworm_light::stream::{MAX_CHUNK_LEN, encode_chunk};
    use glowworm_light::{
        DeviceSettings, EffectMode, EngineTimings, Inbound, LightEngineConfig, MessageChannel,
        OutputDriver, Platform, RenderLoop, Renderer, Route, SettingKey, StreamFallback,
    };

    const LEDS: usize = 64;
    const QUEUE: usize = 8;
    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    struct RecordingPlatform {
        published: Vec<(String, String)>,
        subscribed: Vec<String>,
        unsubscribed: Vec<String>,
        persisted: Vec<(SettingKey, String)>,
        reboots: usize,
        updates: Vec<u32>,
        accept_update: bool,
        watchdog: usize,
        connected: bool,
        reconnects: usize,
        gpio: Option<u8>,
        baud_rate: Option<u32>,
        serial: Vec<String>,
    }

    impl RecordingPlatform {
        fn new() -> Self {
            Self {
                published: Vec::new(),
                subscribed: Vec::new(),
                unsubscribed: Vec::new(),
                persisted: Vec::new(),
                reboots: 0,
                updates: Vec::new(),
                accept_update: true,
                watchdog: 0,
                connected: true,
                reconnects: 0,
                gpio: None,
                baud_rate: None,
                serial: Vec::new(),
            }
        }

        fn published_on(&self, topic: &str) -> Vec<&str> {
            self.published
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, payload)| payload.as_str())
                .collect()
        }
    }

    impl Platform for RecordingPlatform {
        fn publish(&mut self, topic: &str, payload: &[u8]) {
            let payload = String::from_utf8(payload.to_vec()).unwrap();
            self.published.push((topic.to_string(), payload));
        }

        fn subscribe(&mut self, topic: &str) {
            self.subscribed.push(topic.to_string());
        }

        fn unsubscribe(&mut self, topic: &str) {
            self.unsubscribed.push(topic.to_string());
        }

        fn persist(&mut self, key: SettingKey, value: &str) {
            self.persisted.push((key, value.to_string()));
        }

        fn reboot(&mut self) {
            self.reboots += 1;
        }

        fn begin_firmware_update(&mut self, size: u32) -> bool {
            self.updates.push(size);
            self.accept_update
        }

        fn feed_watchdog(&mut self) {
            self.watchdog += 1;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn request_reconnect(&mut self) {
            self.reconnects += 1;
        }

        fn set_gpio(&mut self, gpio: u8) {
            self.gpio = Some(gpio);
        }

        fn set_baud_rate(&mut self, bits_per_second: u32) {
            self.baud_rate = Some(bits_per_second);
        }

        fn write_serial(&mut self, bytes: &[u8]) {
            self.serial.push(String::from_utf8(bytes.to_vec()).unwrap());
        }
    }

    #[derive(Default)]
    struct RecordingDriver {
        last: Vec<Rgb>,
        writes: usize,
    }

    impl OutputDriver for RecordingDriver {
        fn write(&mut self, colors: &[Rgb]) {
            self.last = colors.to_vec();
            self.writes += 1;
        }
    }

    type TestLoop<'a> = RenderLoop<'a, RecordingDriver, RecordingPlatform, LEDS, QUEUE>;

    fn timings() -> EngineTimings {
        EngineTimings {
            frame_interval: Duration::from_millis(10),
            color_transition: Duration::from_millis(100),
            stream_idle_timeout: Duration::from_secs(1),
            telemetry_interval: Duration::from_secs(1),
            ..EngineTimings::default()
        }
    }

    fn config() -> LightEngineConfig {
        let mut settings = DeviceSettings::new(10);
        settings.mac.push_str("AA:BB:CC:DD:EE:FF").unwrap();
        let mut config = LightEngineConfig::new(settings);
        config.timings = timings();
        config
    }

    fn build<'a>(channel: &'a MessageChannel<QUEUE>, config: &LightEngineConfig) -> TestLoop<'a> {
        let renderer = Renderer::new(channel.receiver(), config).unwrap();
        RenderLoop::new(
            renderer,
            RecordingDriver::default(),
            RecordingPlatform::new(),
            config.timings,
        )
    }

    fn send(channel: &MessageChannel<QUEUE>, route: Route, payload: &[u8]) {
        channel
            .try_send(Inbound::new(route, payload).unwrap())
            .unwrap();
    }

    /// Tick every 10 ms from `from` for `count` frames, returns the next time
    fn run(engine: &mut TestLoop<'_>, from: u64, count: u64) -> u64 {
        for i in 0..count {
            engine.tick(Instant::from_millis(from + i * 10));
        }
        from + count * 10
    }

    fn chunks(frame: &[Rgb]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut part = 0;
        loop {
            let mut buffer = [0u8; MAX_CHUNK_LEN];
            match encode_chunk(frame, part, &mut buffer) {
                Ok(len) => out.push(buffer[..len].to_vec()),
                Err(_) => return out,
            }
            part += 1;
        }
    }

    #[test]
    fn test_solid_color_at_half_brightness() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(
            &channel,
            Route::Set,
            br#"{"state":"ON","color":{"r":255,"g":0,"b":0},"brightness":128}"#,
        );

        engine.tick(Instant::from_millis(0));
        assert!(engine.renderer().state().color().in_fade());

        run(&mut engine, 10, 20);
        let output = &engine.output().last;
        assert_eq!(output.len(), 10);
        assert!(output.iter().all(|p| *p == Rgb { r: 128, g: 0, b: 0 }));

        let states = engine.platform().published_on("lights/glowwormluciferin");
        assert_eq!(states.len(), 1);
        assert!(states[0].contains(r#""state":"ON""#));
        assert!(states[0].contains(r#""brightness":128"#));
        assert!(states[0].contains(r#""effect":"solid""#));
    }

    #[test]
    fn test_transition_overrides_fade_length() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(
            &channel,
            Route::Set,
            br#"{"color":{"r":255,"g":0,"b":0},"transition":0}"#,
        );
        engine.tick(Instant::from_millis(0));
        assert!(!engine.renderer().state().color().in_fade());
        assert!(engine.output().last.iter().all(|p| *p == RED));
    }

    #[test]
    fn test_mode_switch_cancels_fade() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"color":{"r":0,"g":0,"b":255}}"#);
        engine.tick(Instant::from_millis(0));
        assert!(engine.renderer().state().color().in_fade());

        send(&channel, Route::Set, br#"{"effect":"rainbow"}"#);
        engine.tick(Instant::from_millis(10));
        let state = engine.renderer().state();
        assert_eq!(state.mode(), EffectMode::Rainbow);
        assert!(!state.color().in_fade());
        assert_eq!(state.color().real(), Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(
            engine.platform().persisted.last(),
            Some(&(SettingKey::Effect, "4".to_string()))
        );
    }

    #[test]
    fn test_effect_powered_off_is_black() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"effect":"bpm","state":"OFF"}"#);
        run(&mut engine, 0, 3);
        assert!(engine.output().last.iter().all(|p| *p == BLACK));

        send(&channel, Route::Set, br#"{"state":"ON"}"#);
        run(&mut engine, 30, 3);
        assert!(engine.output().last.iter().any(|p| *p != BLACK));
    }

    #[test]
    fn test_malformed_document_ignored() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        run(&mut engine, 0, 2);
        send(&channel, Route::Set, b"{not json");
        run(&mut engine, 20, 2);

        assert!(engine.platform().published.is_empty());
        assert!(engine.output().last.iter().all(|p| *p == WHITE));
    }

    #[test]
    fn test_unknown_effect_keeps_mode() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"effect":"aurora","brightness":10}"#);
        engine.tick(Instant::from_millis(0));

        let state = engine.renderer().state();
        assert_eq!(state.mode(), EffectMode::Solid);
        assert_eq!(state.color().brightness(), 10);
    }

    #[test]
    fn test_flash_overlays_effect() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(
            &channel,
            Route::Set,
            br#"{"effect":"rainbow","flash":2,"color":{"r":255,"g":0,"b":0}}"#,
        );
        engine.tick(Instant::from_millis(0));
        assert!(engine.output().last.iter().all(|p| *p == RED));

        engine.tick(Instant::from_millis(700));
        assert!(engine.output().last.iter().all(|p| *p == BLACK));

        engine.tick(Instant::from_millis(2_100));
        assert!(!engine.renderer().state().color().is_flashing());
        assert!(engine.output().last.iter().any(|p| *p != RED));
    }

    #[test]
    fn test_network_stream_drives_strip() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"effect":"GlowWormWifi"}"#);
        engine.tick(Instant::from_millis(0));

        let frame: Vec<Rgb> = (0..40u8).map(|i| Rgb { r: i, g: 2 * i, b: 3 }).collect();
        for chunk in chunks(&frame) {
            send(&channel, Route::Stream, &chunk);
        }
        engine.tick(Instant::from_millis(10));

        assert_eq!(engine.output().last, frame);
        assert_eq!(engine.renderer().stream_frames(), 1);
        assert_eq!(engine.renderer().state().settings().led_count, 40);
        assert!(
            engine
                .platform()
                .persisted
                .contains(&(SettingKey::LedCount, "40".to_string()))
        );
    }

    #[test]
    fn test_stream_from_wrong_source_ignored() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        let frame = vec![RED; 10];

        // Solid mode accepts no stream at all
        send(&channel, Route::Stream, &chunks(&frame)[0]);
        engine.tick(Instant::from_millis(0));
        assert_eq!(engine.renderer().stream_frames(), 0);

        // Serial mode ignores the network topic
        send(&channel, Route::Set, br#"{"effect":"GlowWorm"}"#);
        send(&channel, Route::Stream, &chunks(&frame)[0]);
        engine.tick(Instant::from_millis(10));
        assert_eq!(engine.renderer().stream_frames(), 0);

        send(&channel, Route::Serial, &chunks(&frame)[0]);
        engine.tick(Instant::from_millis(20));
        assert_eq!(engine.renderer().stream_frames(), 1);
        assert_eq!(engine.output().last, frame);
    }

    #[test]
    fn test_idle_stream_holds_last_frame() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"effect":"GlowWormWifi"}"#);
        let frame = vec![RED; 10];
        send(&channel, Route::Stream, &chunks(&frame)[0]);
        engine.tick(Instant::from_millis(0));

        engine.tick(Instant::from_millis(3_000));
        assert!(engine.renderer().state().is_stream_idle());
        assert_eq!(engine.output().last, frame);
    }

    #[test]
    fn test_idle_stream_solid_fallback() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut config = config();
        config.stream_fallback = StreamFallback::Solid;
        let mut engine = build(&channel, &config);
        send(&channel, Route::Set, br#"{"effect":"GlowWormWifi"}"#);
        send(&channel, Route::Stream, &chunks(&vec![RED; 10])[0]);
        engine.tick(Instant::from_millis(0));
        assert!(engine.output().last.iter().all(|p| *p == RED));

        engine.tick(Instant::from_millis(3_000));
        assert!(engine.output().last.iter().all(|p| *p == WHITE));
    }

    #[test]
    fn test_off_timer_powers_down() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut config = config();
        config.timings.off_timeout = Some(Duration::from_secs(1));
        let mut engine = build(&channel, &config);

        engine.tick(Instant::from_millis(0));
        engine.tick(Instant::from_millis(500));
        assert!(engine.renderer().is_on());

        engine.tick(Instant::from_millis(1_500));
        assert!(!engine.renderer().is_on());
        let states = engine.platform().published_on("lights/glowwormluciferin");
        assert!(states.last().unwrap().contains(r#""state":"OFF""#));
    }

    #[test]
    fn test_framerate_telemetry() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        run(&mut engine, 0, 101);

        let reports = engine.platform().published_on("lights/glowwormluciferin/fps");
        assert_eq!(reports, vec![r#"{"framerate":100}"#]);
        assert!(engine.platform().serial.is_empty());
    }

    #[test]
    fn test_serial_info_while_streaming_over_serial() {
        let mut config = config();
        config.settings.effect = EffectMode::GlowWorm;
        config.settings.gpio = 5;
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config);
        let frame = vec![RED; 10];

        for i in 0..=100 {
            send(&channel, Route::Serial, &chunks(&frame)[0]);
            engine.tick(Instant::from_millis(i * 10));
        }

        let platform = engine.platform();
        assert_eq!(
            platform.published_on("lights/glowwormluciferin/fps"),
            vec![r#"{"framerate":100}"#]
        );
        let expected = format!(
            "framerate:100\nver:{}\nlednum:10\ngpio:5\nbaudrate:{}\neffect:1\n",
            env!("CARGO_PKG_VERSION"),
            config.settings.baud_rate.index(),
        );
        assert_eq!(platform.serial, vec![expected]);
    }

    #[test]
    fn test_topic_swap_moves_subscriptions() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"MQTTopic":"desk"}"#);
        engine.tick(Instant::from_millis(0));

        let platform = engine.platform();
        assert_eq!(platform.unsubscribed.len(), 6);
        assert!(
            platform
                .unsubscribed
                .contains(&"lights/glowwormluciferin/set".to_string())
        );
        assert!(platform.subscribed.contains(&"lights/desk/set".to_string()));
        assert!(platform.subscribed.contains(&"cmnd/desk/reboot".to_string()));
        assert!(
            platform
                .persisted
                .contains(&(SettingKey::Topic, "desk".to_string()))
        );
        let topics = engine.renderer().state().topics();
        assert_eq!(topics.route("lights/desk/set"), Some(Route::Set));
        assert_eq!(topics.route("lights/glowwormluciferin/set"), None);
    }

    #[test]
    fn test_firmware_config_report() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(
            &channel,
            Route::FirmwareConfig,
            br#"{"MAC":"11:22:33:44:55:66","lednum":30}"#,
        );
        send(
            &channel,
            Route::FirmwareConfig,
            br#"{"MAC":"aa:bb:cc:dd:ee:ff","lednum":20,"gpio":2,"baudrate":7}"#,
        );
        engine.tick(Instant::from_millis(0));

        let platform = engine.platform();
        let reports = platform.published_on("lights/glowwormluciferin");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains(r#""deviceName":"GlowWorm""#));
        assert!(reports[0].contains(r#""lednum":20"#));
        assert!(reports[0].contains(r#""baudrate":7"#));
        assert_eq!(platform.gpio, Some(2));
        assert_eq!(platform.baud_rate, Some(2_000_000));
        assert_eq!(engine.output().last.len(), 20);
    }

    #[test]
    fn test_led_count_clamped_to_capacity() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Set, br#"{"lednum":5000}"#);
        engine.tick(Instant::from_millis(0));
        assert_eq!(engine.output().last.len(), LEDS);
        assert_eq!(engine.renderer().state().settings().led_count, LEDS as u16);
    }

    #[test]
    fn test_firmware_update_acknowledged() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Update, br#"{"update":123456}"#);
        engine.tick(Instant::from_millis(0));
        engine.platform_mut().accept_update = false;
        send(&channel, Route::Update, br#"{"update":42}"#);
        engine.tick(Instant::from_millis(10));

        let platform = engine.platform();
        assert_eq!(platform.updates, vec![123_456, 42]);
        assert_eq!(
            platform.published_on("lights/glowwormluciferin/update/result"),
            vec![
                r#"{"deviceName":"GlowWorm","update":"OK"}"#,
                r#"{"deviceName":"GlowWorm","update":"KO"}"#
            ]
        );
    }

    #[test]
    fn test_reboot_requires_document() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Reboot, b"garbage");
        engine.tick(Instant::from_millis(0));
        assert_eq!(engine.platform().reboots, 0);

        send(&channel, Route::Reboot, br#"{"reboot":true}"#);
        engine.tick(Instant::from_millis(10));
        assert_eq!(engine.platform().reboots, 1);
    }

    #[test]
    fn test_unsubscribe_switches_stream_instance() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        send(&channel, Route::Unsubscribe, br#"{"manager":"Other","instance":3}"#);
        send(&channel, Route::Unsubscribe, br#"{"manager":"GlowWorm","instance":2}"#);
        engine.tick(Instant::from_millis(0));

        let stream = "lights/glowwormluciferin/set/stream2";
        assert_eq!(engine.renderer().state().topics().stream.as_str(), stream);
        assert_eq!(engine.platform().subscribed, vec![stream.to_string()]);
        assert_eq!(
            engine.platform().unsubscribed,
            vec!["lights/glowwormluciferin/set/stream".to_string()]
        );

        send(&channel, Route::Unsubscribe, br#"{"instance":0}"#);
        engine.tick(Instant::from_millis(10));
        assert_eq!(
            engine.renderer().state().topics().stream.as_str(),
            "lights/glowwormluciferin/set/stream"
        );
    }

    #[test]
    fn test_reconnect_requests_are_throttled() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        engine.platform_mut().connected = false;
        for second in 0..12 {
            engine.tick(Instant::from_millis(second * 1_000));
        }
        assert_eq!(engine.platform().reconnects, 3);
        assert_eq!(engine.platform().watchdog, 12);
    }

    #[test]
    fn test_frame_pacing() {
        let channel = MessageChannel::<QUEUE>::new();
        let mut engine = build(&channel, &config());
        let first = engine.tick(Instant::from_millis(1_000));
        assert_eq!(first.next_deadline, Instant::from_millis(1_010));
        assert_eq!(first.sleep_duration, Duration::from_millis(10));

        let late = engine.tick(Instant::from_millis(1_014));
        assert_eq!(late.next_deadline, Instant::from_millis(1_020));
        assert_eq!(late.sleep_duration, Duration::from_millis(6));
        assert_eq!(engine.output().writes, 2);
    }
}
