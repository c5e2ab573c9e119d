use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use zrelay::{
    init_logging,
    network::banner::{print_banner, print_ready_log, BannerInfo},
    runtime::cancel_on_signal,
    wait_for_shutdown_signal, Settings, Supervisor,
};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("zrelay: {e}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match init_logging(&settings.logging()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("zrelay: unable to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    print_banner(&BannerInfo {
        publish_addr: &settings.publish_addr,
        subscribe_addr: &settings.subscribe_addr,
        subscribers: settings.subscribers.len(),
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(wait_for_shutdown_signal(), shutdown.clone()));

    // Ошибка уже записана в журнал той ролью, где она возникла.
    let res = match Supervisor::new(settings).start(&shutdown).await {
        Ok(relay) => {
            let addrs = relay.addrs();
            print_ready_log(addrs.publish, addrs.subscribe);
            relay.wait().await
        }
        Err(e) => Err(e),
    };
    logging.shutdown();

    match res {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
