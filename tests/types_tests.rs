use saswell_cloud::{
    Capability, CapabilityValue, ControlCommand, DeviceSettings, Error, Mode, PollConfig,
    ProtocolVersion, ReportedMode, Temperature,
};

#[test]
fn mode_value_mapping_is_a_bijection() {
    for mode in Mode::ALL {
        assert_eq!(Mode::from_value(i64::from(mode.to_value())), Some(mode));
        assert_eq!(Mode::from_capability_str(mode.as_capability_str()), Some(mode));
    }
    assert_eq!(Mode::Comfort.to_value(), 0);
    assert_eq!(Mode::Auto.to_value(), 1);
    assert_eq!(Mode::DayOrNight.to_value(), 2);
}

#[test]
fn out_of_range_mode_is_kept_raw() {
    assert_eq!(ReportedMode::from(2), ReportedMode::Known(Mode::DayOrNight));
    assert_eq!(ReportedMode::from(7), ReportedMode::Unknown(7));
    assert_eq!(ReportedMode::from(-1), ReportedMode::Unknown(-1));
}

#[test]
fn temperature_formats_one_decimal() {
    let t = Temperature::from_celsius(21.0);
    assert_eq!(t.to_fixed1(), "21.0");
    assert_eq!(t.to_string(), "21.0\u{00b0}C");
}

#[test]
fn exact_halves_round_away_from_zero() {
    let fixed = |c: f64| Temperature::from_celsius(c).to_fixed1();
    assert_eq!(fixed(21.25), "21.3");
    assert_eq!(fixed(20.25), "20.3");
    assert_eq!(fixed(0.25), "0.3");
    assert_eq!(fixed(22.75), "22.8");
    assert_eq!(fixed(-0.25), "-0.3");
    // stored just below the half
    assert_eq!(fixed(0.15), "0.1");
    assert_eq!(fixed(21.35), "21.4");
    assert_eq!(fixed(18.5), "18.5");
}

#[test]
fn capability_ids_round_trip() {
    for cap in [
        Capability::OnOff,
        Capability::TargetTemperature,
        Capability::Mode,
        Capability::Away,
        Capability::MeasureTemperature,
        Capability::MeasurePower,
    ] {
        assert_eq!(Capability::from_id(cap.id()), Some(cap));
    }
    assert_eq!(Capability::from_id("dim"), None);
    assert!(!Capability::MeasurePower.is_writable());
    assert!(Capability::Away.is_writable());
}

#[test]
fn control_command_from_capability() {
    let cmd = ControlCommand::from_capability(
        Capability::TargetTemperature,
        &CapabilityValue::Number(22.5),
    )
    .unwrap();
    assert_eq!(cmd, ControlCommand::TargetTemperature(Temperature::from_celsius(22.5)));
    assert_eq!(cmd.capability(), Capability::TargetTemperature);

    let err = ControlCommand::from_capability(
        Capability::TargetTemperature,
        &CapabilityValue::Number(f64::NAN),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { ref capability, .. } if capability == "target_temperature"));

    let err = ControlCommand::from_capability(Capability::Away, &CapabilityValue::Number(1.0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));

    let err = ControlCommand::from_capability(
        Capability::MeasureTemperature,
        &CapabilityValue::Number(20.0),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedCapability(_)));
}

#[test]
fn poll_config_rejects_zero() {
    assert!(matches!(PollConfig::new(0), Err(Error::InvalidInterval(0))));
    let config = PollConfig::new(7).unwrap();
    assert_eq!(config.period().as_secs(), 420);
    assert_eq!(config.interval_minutes(), 7);
}

#[test]
fn settings_deserialize_with_defaults() {
    let settings: DeviceSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, DeviceSettings::default());
    assert_eq!(settings.protocol_version().unwrap(), ProtocolVersion::V1);

    let settings: DeviceSettings =
        serde_json::from_str(r#"{"interval": 15, "apiVersion": 2, "m2": 8.5}"#).unwrap();
    assert_eq!(settings.interval, 15);
    assert_eq!(settings.protocol_version().unwrap(), ProtocolVersion::V2);
    assert_eq!(settings.m2, 8.5);
    assert_eq!(settings.poll_config().unwrap().interval_minutes(), 15);

    let settings: DeviceSettings = serde_json::from_str(r#"{"interval": 0}"#).unwrap();
    assert!(settings.poll_config().is_err());
}
