use crate::types::{LstError, LstResult};

/// One set of split-window coefficients b0..b7 with its published RMSE
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitWindowCoefficients {
    pub b: [f64; 8],
    pub rmse: f64,
}

/// A CWV sub-range [low, high] (g/cm^2) with its coefficient set.
/// Both range ends are inclusive, which realizes the 0.5 g/cm^2 overlap
/// blending between adjacent sub-ranges.
#[derive(Debug, Clone, Copy)]
pub struct CwvSubrange {
    pub low: f64,
    pub high: f64,
    pub coefficients: SplitWindowCoefficients,
}

impl CwvSubrange {
    fn contains(&self, cwv: f64) -> bool {
        self.low <= cwv && cwv <= self.high
    }
}

/// Coefficient sets selected for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoefficientSelection {
    /// CWV falls inside exactly one sub-range, or the whole-range fallback
    /// applies (unknown CWV or fixed-coefficient mode)
    Single(SplitWindowCoefficients),
    /// CWV falls inside the 0.5 overlap of two adjacent sub-ranges; LST is
    /// evaluated with both sets and averaged
    Blend(SplitWindowCoefficients, SplitWindowCoefficients),
    /// CWV outside [0.0, 6.3]: no extrapolation, the pixel becomes no-data
    OutOfDomain,
}

/// The fixed, ordered table of split-window coefficient sets over
/// overlapping CWV sub-ranges, plus the whole-range fallback set
/// (Du et al. 2015, Table 1).
#[derive(Debug, Clone)]
pub struct CwvCoefficientTable {
    subranges: Vec<CwvSubrange>,
    whole_range: CwvSubrange,
}

impl Default for CwvCoefficientTable {
    fn default() -> Self {
        let subranges = vec![
            CwvSubrange {
                low: 0.0,
                high: 2.5,
                coefficients: SplitWindowCoefficients {
                    b: [
                        -2.78009, 1.01408, 0.15833, -0.34991, 4.04487, 3.55414, -8.88394, 0.09152,
                    ],
                    rmse: 0.34,
                },
            },
            CwvSubrange {
                low: 2.0,
                high: 3.5,
                coefficients: SplitWindowCoefficients {
                    b: [
                        11.00824, 0.95995, 0.17243, -0.28852, 7.11492, 0.42684, -6.62025, -0.06381,
                    ],
                    rmse: 0.60,
                },
            },
            CwvSubrange {
                low: 3.0,
                high: 4.5,
                coefficients: SplitWindowCoefficients {
                    b: [
                        9.62610, 0.96202, 0.13834, -0.17262, 7.87883, 5.17910, -13.26611, -0.07603,
                    ],
                    rmse: 0.71,
                },
            },
            CwvSubrange {
                low: 4.0,
                high: 5.5,
                coefficients: SplitWindowCoefficients {
                    b: [
                        0.61258, 0.99124, 0.10051, -0.09664, 7.85758, 6.86626, -15.00742, -0.01185,
                    ],
                    rmse: 0.86,
                },
            },
            CwvSubrange {
                low: 5.0,
                high: 6.3,
                coefficients: SplitWindowCoefficients {
                    b: [
                        -0.34808, 0.98123, 0.05599, -0.03518, 11.96444, 9.06710, -14.74085,
                        -0.20471,
                    ],
                    rmse: 0.93,
                },
            },
        ];
        let whole_range = CwvSubrange {
            low: 0.0,
            high: 6.3,
            coefficients: SplitWindowCoefficients {
                b: [
                    -0.41165, 1.00522, 0.14543, -0.27297, 4.06655, -6.92512, -18.27461, 0.24468,
                ],
                rmse: 0.87,
            },
        };
        Self {
            subranges,
            whole_range,
        }
    }
}

impl CwvCoefficientTable {
    /// Build a table from explicit entries, validating ordering. Primarily
    /// for tests substituting synthetic coefficient sets.
    pub fn new(subranges: Vec<CwvSubrange>, whole_range: CwvSubrange) -> LstResult<Self> {
        if subranges.is_empty() {
            return Err(LstError::Configuration(
                "CWV coefficient table needs at least one sub-range".to_string(),
            ));
        }
        for pair in subranges.windows(2) {
            if pair[0].low > pair[1].low {
                return Err(LstError::Configuration(
                    "CWV sub-ranges must be sorted ascending by their lower bound".to_string(),
                ));
            }
        }
        Ok(Self {
            subranges,
            whole_range,
        })
    }

    /// The sub-ranges in ascending order
    pub fn subranges(&self) -> &[CwvSubrange] {
        &self.subranges
    }

    /// The whole-range fallback set used when CWV is unknown
    pub fn whole_range(&self) -> &CwvSubrange {
        &self.whole_range
    }

    /// Select coefficient sets for a pixel's CWV value. A no-data CWV
    /// (NaN) falls back to the whole-range set; a value inside the overlap
    /// of two adjacent sub-ranges selects both.
    pub fn select(&self, cwv: f32) -> CoefficientSelection {
        if cwv.is_nan() {
            return CoefficientSelection::Single(self.whole_range.coefficients);
        }
        let cwv = cwv as f64;
        let mut matches = self
            .subranges
            .iter()
            .filter(|subrange| subrange.contains(cwv));

        match (matches.next(), matches.next()) {
            (Some(first), None) => CoefficientSelection::Single(first.coefficients),
            (Some(first), Some(second)) => {
                CoefficientSelection::Blend(first.coefficients, second.coefficients)
            }
            (None, _) => CoefficientSelection::OutOfDomain,
        }
    }

    /// The whole-range selection, for CWV-agnostic (fixed-coefficient) runs
    pub fn select_whole_range(&self) -> CoefficientSelection {
        CoefficientSelection::Single(self.whole_range.coefficients)
    }
}
