use crate::{config::ConfigLoader, errors::AppError};

pub fn handle_init(loader: &ConfigLoader, force: bool) -> Result<(), AppError> {
    let path = loader.initialize_config(force)?;
    println!("Wrote {}", path.display());
    Ok(())
}
