use anyhow::Result;

use crate::analyzer::EngineConfig;

fn ratio(v: f64, name: &str) -> Result<()> {
    anyhow::ensure!((0.0..=1.0).contains(&v), "{} must be within 0..1 (got {})", name, v);
    Ok(())
}

pub fn check_engine_config(cfg: &EngineConfig) -> Result<()> {
    let m = &cfg.motion;
    anyhow::ensure!(m.match_radius_px > 0.0, "motion.match_radius_px must be positive");
    anyhow::ensure!(m.size_change_threshold >= 0.0, "motion.size_change_threshold must be >= 0");
    anyhow::ensure!(m.aspect_change_threshold >= 0.0, "motion.aspect_change_threshold must be >= 0");
    ratio(m.step, "motion.step")?;
    ratio(m.max_score, "motion.max_score")?;

    let i = &cfg.indicators;
    ratio(i.collision_iou, "indicators.collision_iou")?;
    ratio(i.collision_weight, "indicators.collision_weight")?;
    anyhow::ensure!(i.collision_iou_gain > 0.0, "indicators.collision_iou_gain must be positive");
    ratio(i.orientation_min_confidence, "indicators.orientation_min_confidence")?;
    anyhow::ensure!(i.orientation_max_aspect > 0.0, "indicators.orientation_max_aspect must be positive");
    ratio(i.sudden_motion_threshold, "indicators.sudden_motion_threshold")?;
    anyhow::ensure!(i.cluster_min_vehicles >= 2, "indicators.cluster_min_vehicles must be >= 2");
    anyhow::ensure!(i.cluster_pair_divisor > 0.0, "indicators.cluster_pair_divisor must be positive");
    anyhow::ensure!(i.fallen_motorcycle_max_aspect > 0.0, "indicators.fallen_motorcycle_max_aspect must be positive");
    for (v, name) in [
        (i.orientation_score, "indicators.orientation_score"),
        (i.sudden_motion_weight, "indicators.sudden_motion_weight"),
        (i.cluster_weight, "indicators.cluster_weight"),
        (i.fallen_motorcycle_score, "indicators.fallen_motorcycle_score"),
        (i.rider_weight, "indicators.rider_weight"),
        (i.pedestrian_weight, "indicators.pedestrian_weight"),
    ] {
        ratio(v, name)?;
    }

    let t = &cfg.temporal;
    anyhow::ensure!(t.min_frames >= 1, "temporal.min_frames must be >= 1");
    anyhow::ensure!(t.window >= t.min_frames, "temporal.window ({}) smaller than temporal.min_frames ({})", t.window, t.min_frames);
    ratio(t.high_score, "temporal.high_score")?;

    let d = &cfg.decision;
    ratio(d.primary_score, "decision.primary_score")?;
    ratio(d.secondary_score, "decision.secondary_score")?;
    ratio(d.secondary_temporal, "decision.secondary_temporal")?;
    ratio(d.tertiary_score, "decision.tertiary_score")?;
    anyhow::ensure!(d.tertiary_min_critical >= 1, "decision.tertiary_min_critical must be >= 1");

    let s = &cfg.severity;
    anyhow::ensure!(
        s.critical_confidence >= s.high_confidence && s.high_confidence >= s.medium_confidence,
        "severity confidences must be ordered critical >= high >= medium"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        check_engine_config(&EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_rejects_bad_window() {
        let mut cfg = EngineConfig::default();
        cfg.temporal.window = 2;
        let err = check_engine_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("temporal.window"));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut cfg = EngineConfig::default();
        cfg.decision.primary_score = 1.5;
        assert!(check_engine_config(&cfg).is_err());
    }

    #[test]
    fn test_partial_toml_override_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            [decision]
            primary_score = 0.65

            [temporal]
            window = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.decision.primary_score, 0.65);
        assert_eq!(cfg.decision.secondary_score, 0.55);
        assert_eq!(cfg.temporal.window, 8);
        assert_eq!(cfg.temporal.min_frames, 3);
        assert_eq!(cfg.motion.match_radius_px, 100.0);
        check_engine_config(&cfg).unwrap();
    }
}
