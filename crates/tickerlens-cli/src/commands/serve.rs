use tickerlens_core::AppConfig;

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(args: &ServeArgs, mut config: AppConfig) -> Result<(), CliError> {
    if let Some(addr) = &args.addr {
        config.addr = addr.clone();
    }
    tickerlens_web::serve(config).await?;
    Ok(())
}
