//! Technical indicator math over candle series.
//!
//! Every function returns a series aligned 1:1 with its input, with NaN in
//! the warm-up region. Each computation has an explicit named output; the
//! feature engine maps outputs to columns without any name matching.

use crate::types::Candle;

/// Exponential moving average. k = 2/(n+1), seeded with the first SMA.
pub fn ema(closes: &[f64], period: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() < period {
        return values;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut sum = 0.0;
    let mut current = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        if i < period - 1 {
            sum += close;
        } else if i == period - 1 {
            sum += close;
            current = sum / period as f64;
            values[i] = current;
        } else {
            current = close * k + current * (1.0 - k);
            values[i] = current;
        }
    }

    values
}

/// Simple moving average over a trailing window.
pub fn sma(closes: &[f64], period: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() < period {
        return values;
    }

    let mut sum: f64 = closes[..period - 1].iter().sum();
    for i in period - 1..closes.len() {
        sum += closes[i];
        values[i] = sum / period as f64;
        sum -= closes[i + 1 - period];
    }

    values
}

/// Relative Strength Index with Wilder smoothing of gains and losses.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return values;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i <= period {
            avg_gain += gain / period as f64;
            avg_loss += loss / period as f64;
            if i < period {
                continue;
            }
        } else {
            avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        }

        values[i] = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
    }

    values
}

pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD line = EMA(fast) - EMA(slow); signal = EMA(signal_period) of the
/// line; histogram = line - signal. The signal line is seeded with an SMA
/// over the first `signal_period` valid line values.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let n = closes.len();
    let mut line = vec![f64::NAN; n];
    let mut signal = vec![f64::NAN; n];
    let mut histogram = vec![f64::NAN; n];

    if fast == 0 || slow == 0 || signal_period == 0 {
        return MacdSeries {
            line,
            signal,
            histogram,
        };
    }

    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);
    for i in 0..n {
        if ema_fast[i].is_finite() && ema_slow[i].is_finite() {
            line[i] = ema_fast[i] - ema_slow[i];
        }
    }

    let line_start = slow.saturating_sub(1);
    let signal_start = line_start + signal_period - 1;
    if signal_start < n {
        let seed: f64 = line[line_start..=signal_start].iter().sum::<f64>() / signal_period as f64;
        let k = 2.0 / (signal_period as f64 + 1.0);
        let mut current = seed;
        signal[signal_start] = current;
        for i in signal_start + 1..n {
            current = line[i] * k + current * (1.0 - k);
            signal[i] = current;
        }
    }

    for i in 0..n {
        if line[i].is_finite() && signal[i].is_finite() {
            histogram[i] = line[i] - signal[i];
        }
    }

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

/// Average True Range with Wilder smoothing.
/// TR = max(high-low, |high-prev_close|, |low-prev_close|).
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; candles.len()];
    if period == 0 || candles.len() <= period {
        return values;
    }

    let true_range = |current: &Candle, previous: &Candle| -> f64 {
        let hl = current.high - current.low;
        let hc = (current.high - previous.close).abs();
        let lc = (current.low - previous.close).abs();
        hl.max(hc).max(lc)
    };

    let mut current = 0.0;
    for i in 1..candles.len() {
        let tr = true_range(&candles[i], &candles[i - 1]);
        if i <= period {
            current += tr / period as f64;
            if i < period {
                continue;
            }
        } else {
            current = (current * (period as f64 - 1.0) + tr) / period as f64;
        }
        values[i] = current;
    }

    values
}

pub struct BollingerSeries {
    pub lower: Vec<f64>,
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Volatility envelope: middle = SMA(period), bands at +/- `width` sample
/// standard deviations.
pub fn bollinger(closes: &[f64], period: usize, width: f64) -> BollingerSeries {
    let n = closes.len();
    let middle = sma(closes, period);
    let mut lower = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];

    if period > 1 && n >= period {
        for i in period - 1..n {
            let window = &closes[i + 1 - period..=i];
            let mean = middle[i];
            let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (period as f64 - 1.0);
            let std = variance.sqrt();
            lower[i] = mean - width * std;
            upper[i] = mean + width * std;
        }
    }

    BollingerSeries {
        lower,
        middle,
        upper,
    }
}
