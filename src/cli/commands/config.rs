use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::error::Result;

pub fn execute(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let path = Config::create_sample()?;
            println!("✓ Created sample config at {}", path.display());
            println!("  Set adfs.directory_domain before running `adfs-aws login`.");
        }
        ConfigCommand::Path => {
            let config_path = Config::config_file_path()?;
            println!("Config file path: {}", config_path.display());

            if config_path.exists() {
                println!("Status: File exists");

                match Config::load() {
                    Ok(config) => {
                        println!("Valid: Yes");
                        if config.is_complete() {
                            let federation = config.federation_config()?;
                            println!("Complete: Yes");
                            println!("\nADFS Configuration:");
                            println!("  Directory domain: {}", federation.directory_domain);
                            if !federation.domain.is_empty() {
                                println!("  Domain: {}", federation.domain);
                            }
                            println!("  STS region: {}", federation.region);
                            println!("  Mapped accounts: {}", federation.account_mapping.len());
                        } else {
                            println!("Complete: No (missing adfs.directory_domain)");
                        }
                    }
                    Err(e) => {
                        println!("Valid: No");
                        println!("Error: {}", e);
                    }
                }
            } else {
                println!("Status: File does not exist");
                println!("\nTo create a sample config file, run:");
                println!("  adfs-aws config init");
            }
        }
    }

    Ok(())
}
