use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCmd {
    #[command(
        about = "Print the admin registry",
        long_about = "Print every registered record type with its list columns, filters, search fields and inline children as JSON."
    )]
    Models,
}
