//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn trend_dead_zone_boundaries_are_exact() {
        // The band is strict: exactly +/-0.1% is still Neutral.
        assert_eq!(Trend::from_percent_change(0.1), Trend::Neutral);
        assert_eq!(Trend::from_percent_change(-0.1), Trend::Neutral);
        assert_eq!(Trend::from_percent_change(0.0), Trend::Neutral);
        assert_eq!(Trend::from_percent_change(0.1000001), Trend::Up);
        assert_eq!(Trend::from_percent_change(-0.1000001), Trend::Down);
        assert_eq!(Trend::from_percent_change(2.5), Trend::Up);
        assert_eq!(Trend::from_percent_change(-2.5), Trend::Down);
    }

    #[test]
    fn trend_display_and_parse_round_trip() {
        for trend in [Trend::Up, Trend::Down, Trend::Neutral] {
            assert_eq!(Trend::parse(trend.as_str()), Some(trend));
            assert_eq!(trend.to_string(), trend.as_str());
        }
        assert_eq!(Trend::parse("Sideways"), None);
    }

    #[test]
    fn trend_serialization() {
        assert_eq!(serde_json::to_string(&Trend::Up).unwrap(), "\"Up\"");
        let down: Trend = serde_json::from_str("\"Down\"").unwrap();
        assert_eq!(down, Trend::Down);
    }

    #[test]
    fn prediction_percent_change() {
        let prediction = Prediction {
            symbol: "EUR/USD".to_string(),
            friendly_name: "EUR/USD".to_string(),
            current_price: 1.1,
            predicted_price: 1.1055,
            trend: Trend::Up,
            confidence: 99.0,
            atr: 0.002,
            reason: String::new(),
        };
        assert!((prediction.percent_change() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn record_from_prediction_starts_unresolved() {
        let prediction = Prediction {
            symbol: "USD/JPY".to_string(),
            friendly_name: "USD/JPY".to_string(),
            current_price: 151.2,
            predicted_price: 150.1,
            trend: Trend::Down,
            confidence: 84.0,
            atr: 0.4,
            reason: String::new(),
        };
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = PredictionRecord::from_prediction(&prediction, 4, 77.0, created_at);

        assert_eq!(record.symbol, "USD/JPY");
        assert_eq!(record.created_at, created_at);
        assert_eq!(record.horizon_bars, 4);
        assert_eq!(record.current_price, 151.2);
        assert_eq!(record.predicted_price, 150.1);
        assert_eq!(record.predicted_trend, Trend::Down);
        assert_eq!(record.confidence, 84.0);
        assert_eq!(record.applied_threshold, 77.0);
        assert_eq!(record.resolution, Resolution::Unresolved);
        assert!(record.adjusted_threshold.is_none());
        assert!(!record.is_resolved());
        assert_eq!(record.is_correct(), None);
    }

    #[test]
    fn resolved_record_exposes_correctness() {
        let prediction = Prediction {
            symbol: "EUR/USD".to_string(),
            friendly_name: "EUR/USD".to_string(),
            current_price: 1.1,
            predicted_price: 1.105,
            trend: Trend::Up,
            confidence: 90.0,
            atr: 0.002,
            reason: String::new(),
        };
        let mut record =
            PredictionRecord::from_prediction(&prediction, 4, 75.0, Utc::now());
        record.resolution = Resolution::Resolved {
            actual_price: 1.108,
            actual_trend: Trend::Up,
            is_correct: true,
        };
        assert!(record.is_resolved());
        assert_eq!(record.is_correct(), Some(true));
    }

    #[test]
    fn distinct_records_get_distinct_ids() {
        let prediction = Prediction {
            symbol: "EUR/USD".to_string(),
            friendly_name: "EUR/USD".to_string(),
            current_price: 1.1,
            predicted_price: 1.105,
            trend: Trend::Up,
            confidence: 90.0,
            atr: 0.002,
            reason: String::new(),
        };
        let now = Utc::now();
        let a = PredictionRecord::from_prediction(&prediction, 4, 75.0, now);
        let b = PredictionRecord::from_prediction(&prediction, 4, 75.0, now);
        assert_ne!(a.id, b.id);
    }
}
