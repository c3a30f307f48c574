use anyhow::Result;
use empic_rs::{run, Config};

fn main() -> Result<()> {
    env_logger::init();
    let cfg = Config::new()?;
    run(cfg)
}
