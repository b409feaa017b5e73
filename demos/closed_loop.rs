//! Closed-loop demo: a simulated plant under PID control, one JSON sample per cycle on stdout
//! This example requires the `--features serde` flag to be enabled.
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::path::Path;
use std::thread;
use std::time::Duration;

use bumpless_pid::config::ControlConfig;
use bumpless_pid::publish::Sample;
use bumpless_pid::service::ControlService;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Reads a JSON configuration if a path was given on the command line
fn load_config() -> Result<ControlConfig<f64>, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(Path::new(&path))?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(ControlConfig::builder()
            .kp(1.2)
            .ti(8.0)
            .td(0.5)
            .output_limits(0.0, 100.0)
            .setpoint(60.0)
            .cycle_time_ms(50)
            .tau(1500.0)
            .disturbance(0.02)
            .dead_time_ms(300)
            .build()?),
    }
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config()?;
    let cycle_time = config.cycle_time();

    let service = ControlService::new(config, |sample: &Sample<f64>| {
        match serde_json::to_string(sample) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::error!(%err, "failed to encode sample"),
        }
    });

    service.start_simulation()?;
    thread::sleep(cycle_time * 100);

    // Operator takes over at 30 %, then hands back to automatic without a bump
    service.change_manual_output(0.3)?;
    service.change_mode(false);
    thread::sleep(cycle_time * 40);
    service.change_mode(true);
    thread::sleep(cycle_time * 100);

    // New setpoint, same filter memory
    let retuned = service.config().to_builder().setpoint(40.0).build()?;
    service.set_parameters(retuned);
    thread::sleep(cycle_time * 100);

    service.stop_simulation();
    thread::sleep(Duration::from_millis(100));
    Ok(())
}
