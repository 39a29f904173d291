use crate::{configuration::RecorderConfiguration, error::Error, recorder::Recorder};
use futures::Future;
use hyper::{
    service::{make_service_fn, service_fn},
    Server,
};
use std::{convert::Infallible, io::Write, net::TcpListener, sync::Arc};
use tracing::info;

/// Binds the configured listen address and records until `shutdown` resolves.
pub async fn run_recorder<F>(configuration: RecorderConfiguration, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let recorder = Recorder::from_configuration(&configuration)?;
    let listener = TcpListener::bind(configuration.listen_address())?;

    info!(
        dump = %configuration.dump_path().display(),
        "Appending exchanges to the dump log"
    );

    serve(listener, Arc::new(recorder), shutdown).await
}

/// Serves the recording proxy on an already bound listener.
///
/// Each connection gets its own service; the recorder is the only state they share.
pub async fn serve<W, F>(
    listener: TcpListener,
    recorder: Arc<Recorder<W>>,
    shutdown: F,
) -> Result<(), Error>
where
    W: Write + Send + 'static,
    F: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;
    let address = listener.local_addr()?;
    let backend = recorder.backend().clone();

    let server = Server::from_tcp(listener)?.serve(make_service_fn(move |_| {
        let recorder = recorder.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                let recorder = recorder.clone();
                async move { Ok::<_, Infallible>(recorder.handle(request).await) }
            }))
        }
    }));

    info!(%address, %backend, "Recording proxy listening");
    server.with_graceful_shutdown(shutdown).await?;
    info!("Recording proxy stopped");

    Ok(())
}
