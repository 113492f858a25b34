//! `inputs.mem`: physical memory and swap.

use sysinfo::{RefreshKind, System, SystemExt};
use vane_core::prelude::*;
use vane_core::register_plugin;

register_plugin!(MEM: input "mem" => Mem);

#[derive(Default, Configurable)]
pub struct Mem {
    /// Also report swap totals.
    pub swap: bool,

    system: Option<System>,
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl Input for Mem {
    fn init(&mut self) -> PluginResult<()> {
        self.system = Some(System::new_with_specifics(RefreshKind::new().with_memory()));
        Ok(())
    }

    fn gather(&mut self, acc: &mut Accumulator) -> PluginResult<()> {
        let Some(system) = self.system.as_mut() else {
            return Err(PluginError::custom("mem input was not initialized"));
        };
        system.refresh_memory();

        let total = system.total_memory();
        let used = system.used_memory();
        let available = system.available_memory();

        let mut fields = vec![
            ("total".to_string(), FieldValue::from(total)),
            ("used".to_string(), FieldValue::from(used)),
            ("free".to_string(), FieldValue::from(system.free_memory())),
            ("available".to_string(), FieldValue::from(available)),
            ("used_percent".to_string(), FieldValue::from(percent(used, total))),
            (
                "available_percent".to_string(),
                FieldValue::from(percent(available, total)),
            ),
        ];
        if self.swap {
            fields.push(("swap_total".to_string(), FieldValue::from(system.total_swap())));
            fields.push(("swap_used".to_string(), FieldValue::from(system.used_swap())));
            fields.push(("swap_free".to_string(), FieldValue::from(system.free_swap())));
        }

        acc.add_fields("mem", fields, std::iter::empty());
        Ok(())
    }
}
