use std::time::Duration;

// ** BUS CONFIGURATION ** //

/// `/dev/i2c-1` is the header bus on a Raspberry Pi.
pub const DEFAULT_I2C_BUS: u8 = 1;

// ** STORAGE CONFIGURATION ** //

/// Settings file holding the compass card between runs.
pub const DEFAULT_STORE_PATH: &str = "compass_settings.json";
/// Key the compass card is stored under.
pub const COMPASS_CARD_KEY: &str = "compassCard";

// ** MAIN CONFIGURATION ** //

pub const HEADING_INTERVAL_MS: u64 = 1000;

// ** CALIBRATION CONFIGURATION ** //

/// How long the operator moves the unit for each sensor calibration.
pub const MAGNETOMETER_ADVISORY_PERIOD: Duration = Duration::from_secs(40);
pub const ACCELEROMETER_ADVISORY_PERIOD: Duration = Duration::from_secs(40);
pub const GYROSCOPE_ADVISORY_PERIOD: Duration = Duration::from_secs(20);

/// Parse an I2C address given as `0x60` or `96`.
pub fn parse_i2c_address(text: &str) -> Result<u16, std::num::ParseIntError> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i2c_address() {
        assert_eq!(parse_i2c_address("0x60"), Ok(0x60));
        assert_eq!(parse_i2c_address("96"), Ok(0x60));
        assert!(parse_i2c_address("0xZZ").is_err());
    }

    #[test]
    fn test_default_address_parses_back() {
        // clap renders `default_value_t` with Display before parsing it.
        let rendered = crate::registers::CMPS14_I2C_ADDRESS.to_string();
        assert_eq!(parse_i2c_address(&rendered), Ok(0x60));
    }
}
