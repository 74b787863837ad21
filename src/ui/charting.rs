/// Axis bounds for the results chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBounds {
    pub seconds: f64,
    pub wpm: f64,
}

/// X spans the sampled seconds (at least one), Y the highest sample rounded up
/// to the next multiple of ten
pub fn chart_bounds(points: &[(f64, f64)]) -> ChartBounds {
    let seconds = points.last().map_or(1.0, |&(t, _)| t).max(1.0);
    let highest = points.iter().map(|&(_, wpm)| wpm).fold(0.0, f64::max);
    let wpm = ((highest / 10.0).ceil() * 10.0).max(10.0);
    ChartBounds { seconds, wpm }
}

pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_still_has_axes() {
        assert_eq!(
            chart_bounds(&[]),
            ChartBounds {
                seconds: 1.0,
                wpm: 10.0
            }
        );
    }

    #[test]
    fn bounds_cover_the_series() {
        let bounds = chart_bounds(&[(1.0, 31.0), (2.0, 47.0), (3.0, 12.0)]);
        assert_eq!(bounds.seconds, 3.0);
        assert_eq!(bounds.wpm, 50.0);
    }

    #[test]
    fn labels() {
        assert_eq!(format_label(3.0), "3");
        assert_eq!(format_label(2.34), "2.3");
    }
}
