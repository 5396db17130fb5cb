//! Voip-block schedule payloads
//!
//! A user can block incoming voip calls entirely or only inside weekday and
//! weekend windows. Each window is a list of ISO weekday numbers
//! (Monday = 1 ... Sunday = 7) and an `HH:mm-HH:mm` time range.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{SignalingError, SignalingResult};

const TIME_FORMAT: &str = "%H:%M";

/// `voip_setting` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoipSetting {
    pub voip_block: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<VoipScheduleItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend: Option<VoipScheduleItem>,
}

impl VoipSetting {
    /// Block or allow all calls, with no schedule
    pub fn blocked(voip_block: bool) -> Self {
        Self {
            voip_block,
            weekdays: None,
            weekend: None,
        }
    }
}

/// One schedule window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoipScheduleItem {
    week: Vec<u8>,
    time: String,
}

impl VoipScheduleItem {
    /// Build a window from weekdays and a time range.
    ///
    /// Returns `None` when no day is given.
    pub fn from_days(days: &[Weekday], start: NaiveTime, end: NaiveTime) -> Option<Self> {
        if days.is_empty() {
            return None;
        }

        Some(Self {
            week: days
                .iter()
                .map(|day| day.number_from_monday() as u8)
                .collect(),
            time: format!(
                "{}-{}",
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            ),
        })
    }

    /// Build a window from raw wire values, validating both
    pub fn new(week: Vec<u8>, time: impl Into<String>) -> SignalingResult<Self> {
        let time = time.into();

        if week.is_empty() {
            return Err(SignalingError::invalid_schedule("week list is empty"));
        }
        if let Some(day) = week.iter().find(|day| !(1..=7).contains(*day)) {
            return Err(SignalingError::invalid_schedule(format!(
                "weekday {} is outside 1..=7",
                day
            )));
        }

        let (start, end) = time
            .split_once('-')
            .ok_or_else(|| SignalingError::invalid_schedule(format!("time '{}' is not HH:mm-HH:mm", time)))?;
        for part in [start, end] {
            if part.len() != 5 || NaiveTime::parse_from_str(part, TIME_FORMAT).is_err() {
                return Err(SignalingError::invalid_schedule(format!(
                    "time '{}' is not HH:mm-HH:mm",
                    time
                )));
            }
        }

        Ok(Self { week, time })
    }

    /// ISO weekday numbers covered by this window
    pub fn week(&self) -> &[u8] {
        &self.week
    }

    /// `HH:mm-HH:mm` range
    pub fn time(&self) -> &str {
        &self.time
    }
}

/// `/set-voip-setting` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetVoipSettingBody {
    #[serde(rename = "tNo")]
    pub talent_no: i64,
    pub voip_setting: VoipSetting,
}

/// `/get-voip-setting` body; talents may only query organizations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetVoipSettingBody {
    #[serde(rename = "uNo")]
    pub organization_no: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn builds_weekday_window() {
        let item = VoipScheduleItem::from_days(
            &[Weekday::Mon, Weekday::Tue, Weekday::Fri],
            hm(9, 0),
            hm(18, 30),
        )
        .unwrap();

        assert_eq!(item.week(), &[1, 2, 5]);
        assert_eq!(item.time(), "09:00-18:30");
    }

    #[test]
    fn sunday_is_seven() {
        let item = VoipScheduleItem::from_days(&[Weekday::Sat, Weekday::Sun], hm(0, 0), hm(23, 59)).unwrap();
        assert_eq!(item.week(), &[6, 7]);
    }

    #[test]
    fn no_days_means_no_window() {
        assert!(VoipScheduleItem::from_days(&[], hm(9, 0), hm(10, 0)).is_none());
    }

    #[test]
    fn raw_window_validation() {
        assert!(VoipScheduleItem::new(vec![1, 7], "08:00-12:00").is_ok());
        assert!(VoipScheduleItem::new(vec![0], "08:00-12:00").is_err());
        assert!(VoipScheduleItem::new(vec![8], "08:00-12:00").is_err());
        assert!(VoipScheduleItem::new(vec![], "08:00-12:00").is_err());
        assert!(VoipScheduleItem::new(vec![1], "8:00-12:00").is_err());
        assert!(VoipScheduleItem::new(vec![1], "08:00").is_err());
        assert!(VoipScheduleItem::new(vec![1], "25:00-26:00").is_err());
    }

    #[test]
    fn absent_windows_are_omitted() {
        let value = serde_json::to_value(VoipSetting::blocked(true)).unwrap();
        assert_eq!(value, json!({"voip_block": true}));
    }

    #[test]
    fn set_body_shape() {
        let setting = VoipSetting {
            voip_block: false,
            weekdays: VoipScheduleItem::from_days(&[Weekday::Wed], hm(13, 0), hm(14, 0)),
            weekend: None,
        };
        let value = serde_json::to_value(SetVoipSettingBody {
            talent_no: 12,
            voip_setting: setting,
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "tNo": 12,
                "voip_setting": {
                    "voip_block": false,
                    "weekdays": {"week": [3], "time": "13:00-14:00"}
                }
            })
        );
    }
}
