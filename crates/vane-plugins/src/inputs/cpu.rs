//! `inputs.cpu`: CPU usage per core and across all cores.
//!
//! Usage is measured between two refreshes, so the first gather after `init`
//! reports the usage since the system was sampled in `init`.

use sysinfo::{CpuExt, CpuRefreshKind, RefreshKind, System, SystemExt};
use vane_core::prelude::*;
use vane_core::register_plugin;

register_plugin!(CPU: input "cpu" => Cpu);

#[derive(Default, Configurable)]
pub struct Cpu {
    /// Report one metric per core, tagged `cpu=cpu<N>`.
    pub percpu: bool,
    /// Report the aggregate tagged `cpu=cpu-total`.
    pub totalcpu: bool,
    /// Also report `usage_idle` next to `usage_active`.
    pub report_active: bool,

    system: Option<System>,
}

impl Cpu {
    fn usage_fields(&self, usage: f32) -> Vec<(String, FieldValue)> {
        let active = f64::from(usage).clamp(0.0, 100.0);
        let mut fields = vec![("usage_active".to_string(), FieldValue::from(active))];
        if self.report_active {
            fields.push(("usage_idle".to_string(), FieldValue::from(100.0 - active)));
        }
        fields
    }
}

impl Input for Cpu {
    fn init(&mut self) -> PluginResult<()> {
        if !self.percpu && !self.totalcpu {
            self.totalcpu = true;
        }
        let refresh = RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage());
        self.system = Some(System::new_with_specifics(refresh));
        Ok(())
    }

    fn gather(&mut self, acc: &mut Accumulator) -> PluginResult<()> {
        let Some(system) = self.system.as_mut() else {
            return Err(PluginError::custom("cpu input was not initialized"));
        };
        system.refresh_cpu();

        let per_core: Vec<f32> = if self.percpu {
            system.cpus().iter().map(|cpu| cpu.cpu_usage()).collect()
        } else {
            Vec::new()
        };
        let total = system.global_cpu_info().cpu_usage();

        for (index, usage) in per_core.into_iter().enumerate() {
            acc.add_fields(
                "cpu",
                self.usage_fields(usage),
                [("cpu".to_string(), format!("cpu{index}"))],
            );
        }
        if self.totalcpu {
            acc.add_fields(
                "cpu",
                self.usage_fields(total),
                [("cpu".to_string(), "cpu-total".to_string())],
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vane_core::{assign, describe};

    use super::*;

    #[test]
    fn test_defaults_to_total() {
        let mut cpu = Cpu::default();
        cpu.init().unwrap();
        assert!(cpu.totalcpu);

        let mut acc = Accumulator::new();
        cpu.gather(&mut acc).unwrap();
        let metrics = acc.drain();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].tags["cpu"], "cpu-total");
        assert!(metrics[0].fields.contains_key("usage_active"));
    }

    #[test]
    fn test_percpu_tags_each_core() {
        let mut cpu = Cpu::default();
        assign(json!({"percpu": true, "totalcpu": false}).as_object().unwrap(), &mut cpu).unwrap();
        cpu.init().unwrap();

        let mut acc = Accumulator::new();
        cpu.gather(&mut acc).unwrap();
        for (index, metric) in acc.drain().iter().enumerate() {
            assert_eq!(metric.tags["cpu"], format!("cpu{index}"));
        }
    }

    #[test]
    fn test_internal_state_is_not_configurable() {
        let schema = describe(&Cpu::default());
        assert_eq!(
            schema.keys().map(String::as_str).collect::<Vec<_>>(),
            ["percpu", "report_active", "totalcpu"]
        );
    }

    #[test]
    fn test_gather_before_init_fails() {
        let mut cpu = Cpu::default();
        assert!(cpu.gather(&mut Accumulator::new()).is_err());
    }
}
