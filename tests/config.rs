mod tests {
    use glowworm_light::config::{SettingValue, setting_document};
    use glowworm_light::{BaudRate, DeviceSettings, EffectMode, Route, SettingKey, SettingsStore, Topics};

    struct MapStore(Vec<(SettingKey, &'static str)>);

    impl SettingsStore for MapStore {
        fn read(&mut self, key: SettingKey) -> Option<SettingValue> {
            self.0
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| SettingValue::try_from(*v).unwrap())
        }
    }

    #[test]
    fn test_load_settings() {
        let mut store = MapStore(vec![
            (SettingKey::LedCount, "120"),
            (SettingKey::Gpio, "16"),
            (SettingKey::Topic, "desk"),
            (SettingKey::BaudRate, "5"),
            (SettingKey::Effect, "4"),
        ]);
        let settings = DeviceSettings::new(10).load(&mut store, 511);
        assert_eq!(settings.led_count, 120);
        assert_eq!(settings.gpio, 16);
        assert_eq!(settings.topic.as_str(), "desk");
        assert_eq!(settings.baud_rate, BaudRate::B1000000);
        assert_eq!(settings.effect, EffectMode::Rainbow);
    }

    #[test]
    fn test_load_keeps_defaults_for_bad_values() {
        let mut store = MapStore(vec![
            (SettingKey::LedCount, "many"),
            (SettingKey::BaudRate, "9"),
            (SettingKey::Topic, "a/b"),
            (SettingKey::Effect, "GlowWormWifi"),
        ]);
        let settings = DeviceSettings::new(10).load(&mut store, 511);
        assert_eq!(settings.led_count, 10);
        assert_eq!(settings.baud_rate, BaudRate::B500000);
        assert_eq!(settings.topic.as_str(), "glowwormluciferin");
        assert_eq!(settings.effect, EffectMode::GlowWormWifi);
    }

    #[test]
    fn test_led_count_clamped() {
        let mut settings = DeviceSettings::new(10);
        assert_eq!(settings.set_led_count(0, 511), 1);
        assert_eq!(settings.set_led_count(600, 511), 511);
        assert_eq!(settings.set_led_count(42, 511), 42);
    }

    #[test]
    fn test_every_setting_renders() {
        let mut settings = DeviceSettings::new(511);
        let topic = "t".repeat(32);
        settings.set_topic(&topic).unwrap();
        settings.baud_rate = BaudRate::from_index(7).unwrap();
        settings.effect = EffectMode::MixedRainbow;

        let raw = |key| settings.raw_value(key).map(|value| value.as_str().to_owned());
        assert_eq!(raw(SettingKey::LedCount).as_deref(), Some("511"));
        assert_eq!(raw(SettingKey::Topic), Some(topic.clone()));
        assert_eq!(raw(SettingKey::BaudRate).as_deref(), Some("7"));
        assert_eq!(
            raw(SettingKey::Effect),
            Some(EffectMode::MixedRainbow.as_raw().to_string())
        );
    }

    #[test]
    fn test_setting_documents() {
        let settings = DeviceSettings::new(77);
        let value = settings.raw_value(SettingKey::LedCount).unwrap();
        assert_eq!(value.as_str(), "77");
        assert_eq!(SettingKey::LedCount.file_name(), "led_number.json");
        assert_eq!(
            setting_document(SettingKey::LedCount, &value).unwrap().as_str(),
            r#"{"lednum":"77"}"#
        );
        assert_eq!(
            setting_document(SettingKey::Topic, "glowwormluciferin")
                .unwrap()
                .as_str(),
            r#"{"mqttopic":"glowwormluciferin"}"#
        );
    }

    #[test]
    fn test_baud_rate_indices() {
        assert_eq!(BaudRate::default().bits_per_second(), 500_000);
        assert_eq!(BaudRate::from_index(1).map(BaudRate::bits_per_second), Some(230_400));
        assert_eq!(BaudRate::from_index(7).map(BaudRate::index), Some(7));
        assert_eq!(BaudRate::from_index(0), None);
        assert_eq!(BaudRate::from_index(8), None);
    }

    #[test]
    fn test_topics_routing() {
        let topics = Topics::new("glowwormluciferin").unwrap();
        assert_eq!(topics.light_state.as_str(), "lights/glowwormluciferin");
        assert_eq!(topics.fps.as_str(), "lights/glowwormluciferin/fps");
        assert_eq!(topics.route("lights/glowwormluciferin/set"), Some(Route::Set));
        assert_eq!(
            topics.route("lights/glowwormluciferin/set/stream"),
            Some(Route::Stream)
        );
        assert_eq!(
            topics.route("lights/glowwormluciferin/firmwareconfig"),
            Some(Route::FirmwareConfig)
        );
        assert_eq!(topics.route("cmnd/glowwormluciferin/reboot"), Some(Route::Reboot));
        assert_eq!(topics.route("lights/glowwormluciferin"), None);
        assert_eq!(topics.subscriptions().len(), 6);
    }

    #[test]
    fn test_stream_instance_topic() {
        let mut topics = Topics::new("glowwormluciferin").unwrap();
        topics.set_stream_instance("3").unwrap();
        assert_eq!(topics.stream.as_str(), "lights/glowwormluciferin/set/stream3");
        assert_eq!(
            topics.route("lights/glowwormluciferin/set/stream3"),
            Some(Route::Stream)
        );
        assert_eq!(topics.route("lights/glowwormluciferin/set/stream"), None);
    }
}
