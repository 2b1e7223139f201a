//! Weather sensors (0x50-0x57) and scales (0x5D).

use super::{battery_rssi, require_len, signed_tenths, u16_be};
use crate::error::Result;
use crate::frame::PacketType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HumidityStatus {
    Normal,
    Comfort,
    Dry,
    Wet,
    Unknown(u8),
}

impl HumidityStatus {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Normal,
            0x01 => Self::Comfort,
            0x02 => Self::Dry,
            0x03 => Self::Wet,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Forecast {
    None,
    Sunny,
    PartlyCloudy,
    Cloudy,
    Rain,
    Unknown(u8),
}

impl Forecast {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::None,
            0x01 => Self::Sunny,
            0x02 => Self::PartlyCloudy,
            0x03 => Self::Cloudy,
            0x04 => Self::Rain,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Temperature {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// Degrees Celsius.
    pub temperature: f64,
    pub battery: u8,
    pub rssi: u8,
}

impl Temperature {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Temperature, p, 7)?;
        let (battery, rssi) = battery_rssi(p[6]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            temperature: signed_tenths(p[4], p[5]),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Humidity {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// Relative humidity in percent.
    pub humidity: u8,
    pub status: HumidityStatus,
    pub battery: u8,
    pub rssi: u8,
}

impl Humidity {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Humidity, p, 7)?;
        let (battery, rssi) = battery_rssi(p[6]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            humidity: p[4],
            status: HumidityStatus::from_byte(p[5]),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureHumidity {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub temperature: f64,
    pub humidity: u8,
    pub humidity_status: HumidityStatus,
    pub battery: u8,
    pub rssi: u8,
}

impl TemperatureHumidity {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::TemperatureHumidity, p, 9)?;
        let (battery, rssi) = battery_rssi(p[8]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            temperature: signed_tenths(p[4], p[5]),
            humidity: p[6],
            humidity_status: HumidityStatus::from_byte(p[7]),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Barometric {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// hPa.
    pub pressure: u16,
    pub forecast: Forecast,
    pub battery: u8,
    pub rssi: u8,
}

impl Barometric {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Barometric, p, 8)?;
        let (battery, rssi) = battery_rssi(p[7]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            pressure: u16_be(p[4], p[5]),
            forecast: Forecast::from_byte(p[6]),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureHumidityBarometric {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub temperature: f64,
    pub humidity: u8,
    pub humidity_status: HumidityStatus,
    pub pressure: u16,
    pub forecast: Forecast,
    pub battery: u8,
    pub rssi: u8,
}

impl TemperatureHumidityBarometric {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::TemperatureHumidityBarometric, p, 12)?;
        let (battery, rssi) = battery_rssi(p[11]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            temperature: signed_tenths(p[4], p[5]),
            humidity: p[6],
            humidity_status: HumidityStatus::from_byte(p[7]),
            pressure: u16_be(p[8], p[9]),
            forecast: Forecast::from_byte(p[10]),
            battery,
            rssi,
        })
    }
}

/// La Crosse TX5 reports tips of the bucket, not tenths of a millimetre.
const RAIN6_MM_PER_TIP: f64 = 0.266;

#[derive(Clone, Debug, PartialEq)]
pub struct Rain {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// mm/h, only reported by subtypes 1 and 2.
    pub rate: Option<f64>,
    /// Accumulated rain in mm.
    pub total: f64,
    pub battery: u8,
    pub rssi: u8,
}

impl Rain {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Rain, p, 10)?;
        let raw_rate = u16_be(p[4], p[5]);
        let rate = match p[0] {
            0x01 => Some(f64::from(raw_rate)),
            0x02 => Some(f64::from(raw_rate) / 100.0),
            _ => None,
        };
        let raw_total = u32::from_be_bytes([0, p[6], p[7], p[8]]);
        let total = if p[0] == 0x06 {
            f64::from(raw_total) * RAIN6_MM_PER_TIP
        } else {
            f64::from(raw_total) / 10.0
        };
        let (battery, rssi) = battery_rssi(p[9]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            rate,
            total,
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wind {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// Degrees.
    pub direction: u16,
    /// m/s; subtype 5 reports no average.
    pub average_speed: Option<f64>,
    pub gust: f64,
    /// Only reported by subtype 4.
    pub temperature: Option<f64>,
    pub chill: Option<f64>,
    pub battery: u8,
    pub rssi: u8,
}

impl Wind {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Wind, p, 15)?;
        let subtype = p[0];
        let average_speed =
            (subtype != 0x05).then(|| f64::from(u16_be(p[6], p[7])) / 10.0);
        let (temperature, chill) = if subtype == 0x04 {
            (
                Some(signed_tenths(p[10], p[11])),
                Some(signed_tenths(p[12], p[13])),
            )
        } else {
            (None, None)
        };
        let (battery, rssi) = battery_rssi(p[14]);
        Ok(Self {
            subtype,
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            direction: u16_be(p[4], p[5]),
            average_speed,
            gust: f64::from(u16_be(p[8], p[9])) / 10.0,
            temperature,
            chill,
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Uv {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    pub uv: f64,
    /// Only reported by subtype 3.
    pub temperature: Option<f64>,
    pub battery: u8,
    pub rssi: u8,
}

impl Uv {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Uv, p, 8)?;
        let (battery, rssi) = battery_rssi(p[7]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            uv: f64::from(p[4]) / 10.0,
            temperature: (p[0] == 0x03).then(|| signed_tenths(p[5], p[6])),
            battery,
            rssi,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Weight {
    pub subtype: u8,
    pub sequence: u8,
    pub id: u16,
    /// kg.
    pub weight: f64,
    pub battery: u8,
    pub rssi: u8,
}

impl Weight {
    pub fn decode(p: &[u8]) -> Result<Self> {
        require_len(PacketType::Weight, p, 7)?;
        let (battery, rssi) = battery_rssi(p[6]);
        Ok(Self {
            subtype: p[0],
            sequence: p[1],
            id: u16_be(p[2], p[3]),
            weight: f64::from(u16_be(p[4], p[5])) / 10.0,
            battery,
            rssi,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_temperature() {
        let t = Temperature::decode(&[0x01, 0x00, 0x70, 0x02, 0x80, 0x2D, 0x89]).unwrap();
        assert_eq!(t.id, 0x7002);
        assert_eq!(t.temperature, -4.5);
        assert_eq!(t.battery, 9);
        assert_eq!(t.rssi, 8);
    }

    #[test]
    fn temperature_humidity() {
        let th = TemperatureHumidity::decode(&[0x01, 0x03, 0xAE, 0x01, 0x00, 0xD2, 0x2A, 0x01, 0x69])
            .unwrap();
        assert_eq!(th.temperature, 21.0);
        assert_eq!(th.humidity, 42);
        assert_eq!(th.humidity_status, HumidityStatus::Comfort);
        assert_eq!((th.battery, th.rssi), (9, 6));
    }

    #[test]
    fn barometric_forecast() {
        let b = Barometric::decode(&[0x01, 0x00, 0x00, 0x01, 0x03, 0xF5, 0x02, 0x59]).unwrap();
        assert_eq!(b.pressure, 1013);
        assert_eq!(b.forecast, Forecast::PartlyCloudy);
    }

    #[test]
    fn rain_rate_by_subtype() {
        let r = Rain::decode(&[0x02, 0x00, 0x12, 0x34, 0x01, 0x2C, 0x00, 0x01, 0x00, 0x59]).unwrap();
        assert_eq!(r.rate, Some(3.0));
        assert_eq!(r.total, 25.6);

        let r = Rain::decode(&[0x03, 0x00, 0x12, 0x34, 0x01, 0x2C, 0x00, 0x00, 0x0A, 0x59]).unwrap();
        assert_eq!(r.rate, None);
        assert_eq!(r.total, 1.0);
    }

    #[test]
    fn wind_subtype4_has_temperature() {
        let w = Wind::decode(&[
            0x04, 0x00, 0x00, 0x01, 0x00, 0xB4, 0x00, 0x1E, 0x00, 0x32, 0x80, 0x0A, 0x80, 0x1E, 0x79,
        ])
        .unwrap();
        assert_eq!(w.direction, 180);
        assert_eq!(w.average_speed, Some(3.0));
        assert_eq!(w.gust, 5.0);
        assert_eq!(w.temperature, Some(-1.0));
        assert_eq!(w.chill, Some(-3.0));
    }

    #[test]
    fn wind_subtype5_has_no_average() {
        let w = Wind::decode(&[
            0x05, 0x00, 0x00, 0x01, 0x00, 0x5A, 0x00, 0x1E, 0x00, 0x32, 0x00, 0x00, 0x00, 0x00, 0x79,
        ])
        .unwrap();
        assert_eq!(w.average_speed, None);
        assert_eq!(w.temperature, None);
    }

    #[test]
    fn uv_temperature_only_for_subtype3() {
        let uv = Uv::decode(&[0x03, 0x00, 0x00, 0x01, 0x23, 0x00, 0xFA, 0x59]).unwrap();
        assert_eq!(uv.uv, 3.5);
        assert_eq!(uv.temperature, Some(25.0));
        let uv = Uv::decode(&[0x01, 0x00, 0x00, 0x01, 0x23, 0x00, 0xFA, 0x59]).unwrap();
        assert_eq!(uv.temperature, None);
    }

    #[test]
    fn weight_kg() {
        let w = Weight::decode(&[0x01, 0x00, 0x00, 0x01, 0x02, 0xEE, 0x69]).unwrap();
        assert_eq!(w.weight, 75.0);
    }
}
