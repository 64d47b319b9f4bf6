use crate::cli::{Cli, Shell};
use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};
use std::io;

const BIN_NAME: &str = "adfs-aws";

pub fn execute(shell: Shell) {
    let mut cmd = Cli::command();
    generate(to_clap_shell(shell), &mut cmd, BIN_NAME, &mut io::stdout());

    eprintln!("\n# Installation:");
    eprintln!("#   {}", install_hint(shell));
}

fn to_clap_shell(shell: Shell) -> ClapShell {
    match shell {
        Shell::Bash => ClapShell::Bash,
        Shell::Zsh => ClapShell::Zsh,
        Shell::Fish => ClapShell::Fish,
        Shell::PowerShell => ClapShell::PowerShell,
        Shell::Elvish => ClapShell::Elvish,
    }
}

fn install_hint(shell: Shell) -> String {
    match shell {
        Shell::Bash => format!("eval \"$({} completions bash)\"  # in ~/.bashrc", BIN_NAME),
        Shell::Zsh => format!("eval \"$({} completions zsh)\"  # in ~/.zshrc", BIN_NAME),
        Shell::Fish => format!(
            "{0} completions fish > ~/.config/fish/completions/{0}.fish",
            BIN_NAME
        ),
        Shell::PowerShell => format!(
            "{} completions powershell | Out-String | Invoke-Expression",
            BIN_NAME
        ),
        Shell::Elvish => format!("eval ({} completions elvish | slurp)", BIN_NAME),
    }
}
