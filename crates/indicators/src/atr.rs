use crate::Indicator;
use rust_decimal::Decimal;

/// Average True Range with Wilder smoothing.
///
/// The first value is the plain mean of the first `period` true ranges;
/// afterwards `atr = (prev * (n - 1) + tr) / n`.
#[derive(Debug, Clone)]
pub struct Atr {
    len: usize,
    prev_close: Option<Decimal>,
    warmup_sum: Decimal,
    warmup_count: usize,
    current: Option<Decimal>,
}

/// True range of one bar given the previous close (if any).
pub fn true_range(high: Decimal, low: Decimal, prev_close: Option<Decimal>) -> Decimal {
    let hl = high - low;
    match prev_close {
        Some(pc) => hl.max((high - pc).abs()).max((low - pc).abs()),
        None => hl,
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "ATR period must be > 0");
        Self {
            len: period,
            prev_close: None,
            warmup_sum: Decimal::ZERO,
            warmup_count: 0,
            current: None,
        }
    }

    /// Feed one high/low/close bar.
    pub fn next_hlc(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let tr = true_range(high, low, self.prev_close);
        self.prev_close = Some(close);
        self.push_tr(tr)
    }

    pub fn value(&self) -> Option<Decimal> {
        self.current
    }

    /// Run a whole high/low/close series and return the final ATR.
    pub fn over<I>(period: usize, hlc: I) -> Option<Decimal>
    where
        I: IntoIterator<Item = (Decimal, Decimal, Decimal)>,
    {
        let mut atr = Atr::new(period);
        for (h, l, c) in hlc {
            atr.next_hlc(h, l, c);
        }
        atr.value()
    }

    fn push_tr(&mut self, tr: Decimal) -> Option<Decimal> {
        let n = Decimal::from(self.len);
        match self.current {
            None => {
                self.warmup_sum += tr;
                self.warmup_count += 1;
                if self.warmup_count >= self.len {
                    self.current = Some(self.warmup_sum / n);
                }
            }
            Some(prev) => {
                self.current = Some((prev * (n - Decimal::ONE) + tr) / n);
            }
        }
        self.current
    }
}

impl Indicator for Atr {
    /// Close-only feed: the true range degrades to the absolute close change.
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        let Some(prev) = self.prev_close.replace(value) else {
            return None;
        };
        self.push_tr((value - prev).abs())
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.warmup_sum = Decimal::ZERO;
        self.warmup_count = 0;
        self.current = None;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_true_range_uses_gap() {
        assert_eq!(true_range(dec!(10), dec!(9), None), dec!(1));
        assert_eq!(true_range(dec!(10), dec!(9), Some(dec!(12))), dec!(3));
    }

    #[test]
    fn test_atr_seed_then_wilder() {
        let mut atr = Atr::new(3);
        assert!(atr.next_hlc(dec!(48.70), dec!(47.79), dec!(48.16)).is_none());
        assert!(atr.next_hlc(dec!(48.72), dec!(48.14), dec!(48.61)).is_none());
        // TRs: 0.91, 0.58, 0.51
        let seed = atr.next_hlc(dec!(48.90), dec!(48.39), dec!(48.75)).unwrap();
        assert_eq!(seed, dec!(2.00) / dec!(3));

        // TR 0.50 -> (seed * 2 + 0.50) / 3
        let next = atr.next_hlc(dec!(49.00), dec!(48.50), dec!(48.80)).unwrap();
        assert_eq!(next, (seed * dec!(2) + dec!(0.50)) / dec!(3));
    }

    #[test]
    fn test_close_only_feed_and_reset() {
        let mut atr = Atr::new(2);
        assert!(atr.next(dec!(100)).is_none());
        assert!(atr.next(dec!(102)).is_none());
        assert_eq!(atr.next(dec!(101)), Some(dec!(1.5)));
        assert!(atr.is_ready());
        atr.reset();
        assert!(!atr.is_ready());
        assert_eq!(atr.period(), 2);
    }

    #[test]
    fn test_over_series() {
        let bars = vec![
            (dec!(11), dec!(10), dec!(10.5)),
            (dec!(12), dec!(10), dec!(11)),
        ];
        assert_eq!(Atr::over(2, bars.clone()), Some(dec!(1.5)));
        assert_eq!(Atr::over(3, bars), None);
    }
}
