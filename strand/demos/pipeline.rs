//! Example: A staged pipeline of routines

use strand::time::{self, sleep};
use strand::{Args, Co, Error, RoutineFn, Value};
use std::time::Duration;

/// Pretends to fetch a record, handing the result back through the continuation.
fn fetch() -> RoutineFn {
    strand::routine(|co: Co, args: Args| async move {
        let id = args.value(0).map(Value::expect_int).transpose()?.unwrap_or(1);
        let next = args.next().ok_or(Error::Incomplete)?;

        time::set_timeout(Duration::from_millis(20), move || {
            next.resolve(format!("record-{id}"))
        })?;

        co.wait().await
    })
}

fn transform() -> RoutineFn {
    strand::routine(|co: Co, args: Args| async move {
        let record = args.value(0).cloned().unwrap_or_default();
        co.suspend(sleep(Duration::from_millis(10))).await?;
        Ok::<_, Error>(record.to_string().to_uppercase())
    })
}

#[strand::main]
async fn main(co: Co) -> Result<(), Error> {
    strand::logging::init();

    let fetch = strand::wrap(fetch());
    let transform = strand::wrap(transform());

    for id in 1..=3 {
        let record = co.suspend(fetch.call([id])?).await?;
        println!("fetched {record}");

        let shaped = co.suspend(transform.call([record])?).await?;
        println!("transformed {shaped}");
    }

    Ok(())
}
