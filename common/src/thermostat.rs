use crate::{config::Settings, types::Mode};

/// Returns the updated demand for an air reading.
///
/// A missing reading never demands the compressor. When `previous` is `true`
/// only the release threshold is checked; when `false` only the engage
/// threshold is. With zero hysteresis this makes demand flip on exact
/// equality with the setpoint.
pub fn demand(previous: bool, t2: Option<f32>, settings: &Settings) -> bool {
    let Some(air) = t2.filter(|value| value.is_finite()) else {
        return false;
    };

    let lower = settings.air_setpoint_c - settings.hysteresis_c;
    let upper = settings.air_setpoint_c + settings.hysteresis_c;

    match (settings.mode, previous) {
        (Mode::Cooling, false) => air >= upper,
        (Mode::Cooling, true) => air > lower,
        (Mode::Heating, false) => air <= lower,
        (Mode::Heating, true) => air < upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(mode: Mode, setpoint: f32, hysteresis: f32) -> Settings {
        Settings {
            air_setpoint_c: setpoint,
            hysteresis_c: hysteresis,
            mode,
            ..Settings::default()
        }
    }

    fn run(settings: &Settings, readings: &[f32]) -> Vec<bool> {
        let mut current = false;
        readings
            .iter()
            .map(|reading| {
                current = demand(current, Some(*reading), settings);
                current
            })
            .collect()
    }

    #[test]
    fn cooling_never_engages_inside_band() {
        let settings = settings(Mode::Cooling, 4.0, 1.0);
        assert_eq!(
            run(&settings, &[3.0, 4.5, 4.0, 3.5]),
            vec![false, false, false, false]
        );
    }

    #[test]
    fn cooling_holds_until_lower_edge() {
        let settings = settings(Mode::Cooling, 4.0, 1.0);
        assert_eq!(
            run(&settings, &[5.5, 4.5, 3.5, 2.5]),
            vec![true, true, true, false]
        );
    }

    #[test]
    fn cooling_engages_and_releases_on_band_edges() {
        let settings = settings(Mode::Cooling, 4.0, 1.0);
        assert_eq!(run(&settings, &[5.0, 3.0]), vec![true, false]);
    }

    #[test]
    fn heating_mirrors_cooling() {
        let settings = settings(Mode::Heating, 20.0, 0.5);
        assert_eq!(
            run(&settings, &[20.0, 19.5, 20.2, 20.5, 19.8]),
            vec![false, true, true, false, false]
        );
    }

    #[test]
    fn missing_air_reading_drops_demand() {
        let settings = settings(Mode::Cooling, 4.0, 1.0);
        assert!(!demand(true, None, &settings));
        assert!(!demand(false, Some(f32::NAN), &settings));
    }

    #[test]
    fn zero_band_flips_on_equality() {
        let settings = settings(Mode::Cooling, 4.0, 0.0);
        assert!(demand(false, Some(4.0), &settings));
        assert!(!demand(true, Some(4.0), &settings));
        assert!(demand(true, Some(4.1), &settings));
    }
}
