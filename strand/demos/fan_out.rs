//! Example: Fanning out to parallel routines and collecting results

use strand::time::sleep;
use strand::{Args, Co, Error, Value};
use std::time::Duration;

#[strand::main]
async fn main(co: Co, args: Args) -> Result<(), Error> {
    let worker = strand::routine(|co: Co, args: Args| async move {
        let n = args.value(0).map(Value::expect_int).transpose()?.unwrap_or(0);
        co.suspend(sleep(Duration::from_millis(40 - n as u64 * 10))).await?;
        println!("worker {n} done");
        Ok::<_, Error>(n * n)
    });

    let next = args.next().ok_or(Error::Incomplete)?;

    // Every worker settles its own slot; results come back in push order
    for n in 0..4 {
        strand::run_with(&worker, [n], next.push())?;
    }
    let squares = co.suspend(next.all()).await?;
    println!("squares: {squares}");

    // The first worker to finish wins
    for n in 0..4 {
        strand::run_with(&worker, [n], next.push())?;
    }
    let fastest = co.suspend(next.any()).await?;
    println!("fastest: {fastest}");

    Ok(())
}
