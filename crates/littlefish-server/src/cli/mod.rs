/*
[INPUT]:  CLI subcommands
[OUTPUT]: Subcommand implementations
[POS]:    CLI layer
[UPDATE]: When adding subcommands
*/

pub mod init;
