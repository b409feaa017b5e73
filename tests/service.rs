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
#![cfg(feature = "std")]

use fixtures::test_pid::proportional_config;

use bumpless_pid::config::{ConfigError, ControlConfig};
use bumpless_pid::publish::{Publisher, Sample};
use bumpless_pid::service::ControlService;

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;

#[derive(Default)]
struct Recorder {
    samples: Mutex<Vec<Sample<f64>>>,
    updates: Mutex<Vec<ControlConfig<f64>>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    fn last(&self) -> Option<Sample<f64>> {
        self.samples.lock().unwrap().last().copied()
    }
}

#[derive(Clone, Default)]
struct SharedRecorder(Arc<Recorder>);

impl Publisher<f64> for SharedRecorder {
    fn publish(&self, sample: &Sample<f64>) {
        self.0.samples.lock().unwrap().push(*sample);
    }

    fn parameters_updated(&self, config: &ControlConfig<f64>) {
        self.0.updates.lock().unwrap().push(*config);
    }
}

fn fast_loop() -> ControlConfig<f64> {
    proportional_config()
        .ti(5.0)
        .cycle_time_ms(1)
        .tau(5.0)
        .dead_time_ms(2)
        .build()
        .unwrap()
}

fn make_service(config: ControlConfig<f64>) -> (ControlService<SharedRecorder>, Arc<Recorder>) {
    let recorder = SharedRecorder::default();
    let handle = Arc::clone(&recorder.0);
    (ControlService::new(config, recorder), handle)
}

/// Polls `condition` until it holds or `timeout` elapses
fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

mod test_direct_measurement {

    use super::*;

    #[test]
    fn test_send_process_variable_publishes_and_returns_sample() {
        let (service, recorder) = make_service(proportional_config().build().unwrap());

        let sample = service.send_process_variable(0.0);

        assert_eq!(sample.output, 0.5);
        assert_eq!(sample.scaled_output, 50.0);
        assert_eq!(sample.process_variable, 0.0);
        assert_eq!(sample.setpoint, 50.0);
        assert_eq!(recorder.last(), Some(sample));
        assert!(!service.is_running());
    }

    #[test]
    fn test_scaled_output_spans_min_to_max() {
        let config = proportional_config()
            .output_limits(20.0, 100.0)
            .build()
            .unwrap();
        let (service, _) = make_service(config);

        // Error (50 - 0) / 100 = 0.5 maps to 20 + 0.5 * 80
        let sample = service.send_process_variable(0.0);
        assert_eq!(sample.scaled_output, 60.0);
    }

    #[test]
    fn test_closure_publisher() {
        let (tx, rx) = mpsc::channel();
        let service = ControlService::new(
            proportional_config().build().unwrap(),
            move |sample: &Sample<f64>| {
                let _ = tx.send(*sample);
            },
        );

        service.send_process_variable(25.0);
        let sample = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_relative_eq!(sample.output, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_mode_and_manual_output_entry_points() {
        let (service, _) = make_service(proportional_config().build().unwrap());

        service.change_manual_output(0.8).unwrap();
        service.change_mode(false);
        assert_eq!(service.send_process_variable(10.0).output, 0.8);

        assert_eq!(
            service.change_manual_output(f64::INFINITY),
            Err(ConfigError::NonFinite {
                field: "manual_output"
            })
        );
        assert_eq!(service.config().manual_output(), 0.8);

        // Back to automatic at the setpoint: no bump
        service.change_mode(true);
        assert_relative_eq!(
            service.send_process_variable(50.0).output,
            0.8,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_set_parameters_notifies_publisher_and_keeps_memory() {
        let (service, recorder) = make_service(proportional_config().build().unwrap());
        service.send_process_variable(0.0);

        let retuned = service.config().to_builder().setpoint(80.0).build().unwrap();
        service.set_parameters(retuned);

        assert_eq!(*recorder.updates.lock().unwrap(), vec![retuned]);
        assert_eq!(service.config(), retuned);
        // Output continues from 0.5: error rises from 0.5 to 0.8
        assert_relative_eq!(
            service.send_process_variable(0.0).output,
            0.8,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_reset_zeroes_controller() {
        let (service, _) = make_service(proportional_config().build().unwrap());
        service.send_process_variable(0.0);
        assert_eq!(service.output(), 0.5);

        service.reset();
        assert_eq!(service.output(), 0.0);
        assert_eq!(service.send_process_variable(0.0).output, 0.5);
    }
}

mod test_simulation_loop {

    use super::*;

    #[test]
    fn test_loop_publishes_every_cycle() {
        let (service, recorder) = make_service(fast_loop());

        service.start_simulation().unwrap();
        assert!(service.is_running());
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 10));

        service.stop_simulation();
        assert!(!service.is_running());
    }

    #[test]
    fn test_loop_settles_at_setpoint() {
        let (service, recorder) = make_service(fast_loop());

        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(10), || recorder.count() >= 300));
        service.stop_simulation();

        let sample = recorder.last().unwrap();
        assert_relative_eq!(sample.process_variable, 50.0, epsilon = 0.5);
        assert_relative_eq!(sample.output, 0.5, epsilon = 0.01);
        assert_eq!(sample.setpoint, 50.0);
        assert!(recorder
            .samples
            .lock()
            .unwrap()
            .iter()
            .all(|s| (0.0..=1.0).contains(&s.output)));
    }

    #[test]
    fn test_start_while_running_is_ignored() {
        let (service, recorder) = make_service(fast_loop());

        service.start_simulation().unwrap();
        service.start_simulation().unwrap();
        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 5));

        // A single stop must silence everything; an orphaned second worker would keep going
        service.stop_simulation();
        thread::sleep(Duration::from_millis(50));
        let settled = recorder.count();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(recorder.count(), settled);
    }

    #[test]
    fn test_stop_returns_without_waiting_for_worker() {
        let config = fast_loop().to_builder().cycle_time_ms(400).build().unwrap();
        let (service, recorder) = make_service(config);

        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 1));

        let started = Instant::now();
        service.stop_simulation();
        assert!(started.elapsed() < Duration::from_millis(200));
        assert!(!service.is_running());

        // At most the iteration in flight gets published
        let at_stop = recorder.count();
        thread::sleep(Duration::from_millis(900));
        assert!(recorder.count() <= at_stop + 1);
    }

    #[test]
    fn test_restart_does_not_wait_out_a_long_cycle() {
        let config = fast_loop().to_builder().cycle_time_ms(60_000).build().unwrap();
        let (service, recorder) = make_service(config);

        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 1));

        // The first worker is parked for a minute; stopping must wake it so the join is quick
        let started = Instant::now();
        service.stop_simulation();
        service.start_simulation().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(service.is_running());

        // The new worker runs its first iteration right away
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 2));
        service.stop_simulation();
    }

    #[test]
    fn test_restart_after_stop() {
        let (service, recorder) = make_service(fast_loop());

        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 5));
        service.stop_simulation();

        service.start_simulation().unwrap();
        assert!(service.is_running());
        let before = recorder.count();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= before + 5));
        service.stop_simulation();
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let (service, recorder) = make_service(fast_loop());
        service.stop_simulation();
        assert!(!service.is_running());
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn test_parameter_update_reaches_running_loop() {
        let (service, recorder) = make_service(fast_loop());
        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 5));

        let retuned = service.config().to_builder().setpoint(70.0).build().unwrap();
        service.set_parameters(retuned);
        assert!(wait_for(Duration::from_secs(5), || recorder
            .last()
            .is_some_and(|s| s.setpoint == 70.0)));

        service.change_manual_output(0.2).unwrap();
        service.change_mode(false);
        assert!(wait_for(Duration::from_secs(5), || recorder
            .last()
            .is_some_and(|s| s.output == 0.2)));

        service.stop_simulation();
    }

    #[test]
    fn test_zero_cycle_time_keeps_loop_alive() {
        let config = fast_loop().to_builder().cycle_time_ms(0).build().unwrap();
        let (service, recorder) = make_service(config);

        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 10));
        service.stop_simulation();

        assert!(recorder.last().unwrap().output.is_finite());
    }

    #[test]
    fn test_dropping_service_stops_worker() {
        let (service, recorder) = make_service(fast_loop());
        service.start_simulation().unwrap();
        assert!(wait_for(Duration::from_secs(5), || recorder.count() >= 5));

        drop(service);
        thread::sleep(Duration::from_millis(50));
        let settled = recorder.count();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(recorder.count(), settled);
    }
}
