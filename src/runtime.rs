#[cfg(feature = "blocking")]
use crate::ActionResult;

#[cfg(all(feature = "blocking", feature = "rt-tokio"))]
use crate::{Error, ErrorCategory, ErrorRecord};

#[cfg(feature = "backend-powershell")]
use futures_util::future::BoxFuture;
#[cfg(feature = "blocking")]
use std::future::Future;
#[cfg(feature = "backend-powershell")]
use std::time::Duration;

#[cfg(all(feature = "backend-powershell", feature = "rt-async-io"))]
pub(crate) fn sleep(duration: Duration) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let _ = async_io::Timer::after(duration).await;
    })
}

#[cfg(all(feature = "backend-powershell", feature = "rt-tokio"))]
pub(crate) fn sleep(duration: Duration) -> BoxFuture<'static, ()> {
    Box::pin(tokio::time::sleep(duration))
}

#[cfg(feature = "blocking")]
pub(crate) fn block_on_action<T>(future: impl Future<Output = ActionResult<T>>) -> ActionResult<T> {
    #[cfg(feature = "rt-async-io")]
    {
        async_io::block_on(future)
    }

    #[cfg(feature = "rt-tokio")]
    {
        tokio_block_on(future)
    }
}

#[cfg(all(feature = "blocking", feature = "rt-tokio"))]
fn tokio_block_on<T>(future: impl Future<Output = ActionResult<T>>) -> ActionResult<T> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(runtime_error(
            "blocking API cannot run inside a tokio runtime; use the async API",
        ));
    }

    type Init = std::result::Result<tokio::runtime::Runtime, String>;
    static RT: std::sync::OnceLock<Init> = std::sync::OnceLock::new();

    let rt = match RT.get_or_init(|| {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| e.to_string())
    }) {
        Ok(rt) => rt,
        Err(detail) => {
            return Err(runtime_error(format!("init tokio runtime: {detail}")));
        }
    };

    rt.block_on(future)
}

#[cfg(all(feature = "blocking", feature = "rt-tokio"))]
fn runtime_error(context: impl Into<String>) -> ErrorRecord {
    ErrorRecord::new(
        "TaskBusRuntimeUnavailable",
        ErrorCategory::SessionEstablishment,
        "localhost",
        Error::IoError {
            context: context.into(),
        },
    )
}
