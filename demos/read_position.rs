//! Read position and temperature from one actuator
//!
//! ```text
//! cargo run --example read_position --features serial -- /dev/ttyUSB0 1
//! ```

use std::time::Duration;

use dxlink::{ActuatorId, Link, LinkConfig, Model, Register, SerialChannel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_owned());
    let id: u8 = args.next().map_or(Ok(1), |arg| arg.parse())?;

    let config = LinkConfig::default().with_read_timeout(Duration::from_millis(50));
    let channel = SerialChannel::open(&path, config.baud_rate)?;
    let mut link = Link::with_config(channel, ActuatorId::new(id)?, config);

    let flags = link.ping()?;
    println!("Actuator {id} answered ping, flags: {flags}");

    let model_number = link.read(Register::ModelNumber)?;
    let model = Model::from_model_number(model_number).unwrap_or(Model::AX12);
    println!("Model number {model_number} ({})", model.name);

    let position = link.read(Register::PresentPosition)?;
    let temperature = link.read(Register::PresentTemperature)?;
    println!(
        "Position {position} ({:.1}°), temperature {temperature}°C",
        model.position_to_degrees(position)
    );

    let stats = link.stats();
    println!(
        "{} exchanges, {} retries, avg latency {:?} µs",
        stats.exchanges,
        stats.retries,
        stats.avg_latency_us()
    );

    Ok(())
}
