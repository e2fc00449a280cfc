// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn as_arg() -> Arg {
    Arg::new("as")
        .long("as")
        .value_name("EMAIL")
        .help("Acting user; admins see every record, others only their own")
        .required(true)
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .value_parser(value_parser!(i64))
        .required(true)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

pub fn build_cli() -> Command {
    Command::new("recurdesk")
        .about("Recurring voucher and contract tracking with daily mail digests")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the database and seed defaults"))
        .subcommand(
            Command::new("user")
                .about("Manage users")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(
                            Arg::new("admin")
                                .long("admin")
                                .action(ArgAction::SetTrue)
                                .help("Grant admin scope (sees all records)"),
                        ),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("voucher")
                .about("Recurring monthly vouchers")
                .subcommand(
                    Command::new("add")
                        .arg(as_arg())
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(
                            Arg::new("day")
                                .long("day")
                                .value_parser(value_parser!(u32).range(0..=31))
                                .required(true)
                                .help("Day of month the voucher recurs on; 0 = last day"),
                        )
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("vat").long("vat")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(as_arg())
                        .arg(Arg::new("month").long("month").value_name("YYYY-MM")),
                ))
                .subcommand(json_flags(
                    Command::new("pending")
                        .about("Vouchers still needing attention this month")
                        .arg(as_arg())
                        .arg(Arg::new("date").long("date").value_name("YYYY-MM-DD")),
                ))
                .subcommand(
                    Command::new("edit")
                        .arg(as_arg())
                        .arg(id_arg())
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("day")
                                .long("day")
                                .value_parser(value_parser!(u32).range(0..=31)),
                        )
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("vat").long("vat")),
                )
                .subcommand(Command::new("rm").arg(as_arg()).arg(id_arg()))
                .subcommand(
                    Command::new("complete")
                        .about("Mark (or unmark) a voucher done for one month")
                        .arg(as_arg())
                        .arg(id_arg())
                        .arg(Arg::new("month").long("month").value_name("YYYY-MM"))
                        .arg(Arg::new("undo").long("undo").action(ArgAction::SetTrue)),
                ),
        )
        .subcommand(
            Command::new("contract")
                .about("Contracts tracked for expiry")
                .subcommand(
                    Command::new("add")
                        .arg(as_arg())
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD").required(true))
                        .arg(Arg::new("start").long("start").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("company").long("company"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("contact").long("contact"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(as_arg())
                        .arg(Arg::new("date").long("date").value_name("YYYY-MM-DD"))
                        .arg(
                            Arg::new("expiring")
                                .long("expiring")
                                .action(ArgAction::SetTrue)
                                .help("Only expired or expiring-soon contracts"),
                        ),
                ))
                .subcommand(
                    Command::new("edit")
                        .arg(as_arg())
                        .arg(id_arg())
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("start").long("start").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("company").long("company"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("contact").long("contact"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(Command::new("rm").arg(as_arg()).arg(id_arg()))
                .subcommand(
                    Command::new("renew")
                        .about("Archive the current term and start a new one")
                        .arg(as_arg())
                        .arg(id_arg())
                        .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD").required(true))
                        .arg(Arg::new("start").long("start").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("contact").long("contact"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(Command::new("history").arg(as_arg())),
        )
        .subcommand(
            Command::new("trash")
                .about("Soft-deleted records")
                .subcommand(Command::new("list").arg(as_arg()))
                .subcommand(
                    Command::new("restore")
                        .arg(as_arg())
                        .arg(Arg::new("kind").long("kind").value_name("voucher|contract").required(true))
                        .arg(id_arg()),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Permanently delete one trashed record")
                        .arg(as_arg())
                        .arg(Arg::new("kind").long("kind").value_name("voucher|contract").required(true))
                        .arg(id_arg()),
                )
                .subcommand(
                    Command::new("empty")
                        .about("Permanently delete everything in the caller's trash")
                        .arg(as_arg()),
                ),
        )
        .subcommand(
            Command::new("alerts")
                .about("Daily digest run and history")
                .subcommand(
                    Command::new("run")
                        .about("Send today's digests (intended for cron; re-running is safe)")
                        .arg(Arg::new("date").long("date").value_name("YYYY-MM-DD")),
                )
                .subcommand(json_flags(
                    Command::new("history")
                        .arg(as_arg())
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(i64))
                                .default_value("20"),
                        ),
                )),
        )
        .subcommand(
            Command::new("settings")
                .about("Mail opt-in and SMTP configuration")
                .subcommand(
                    Command::new("mail")
                        .subcommand(
                            Command::new("set")
                                .arg(as_arg())
                                .arg(Arg::new("email").long("email").help("Digest destination address"))
                                .arg(
                                    Arg::new("active")
                                        .long("active")
                                        .value_parser(value_parser!(bool)),
                                ),
                        )
                        .subcommand(Command::new("show")),
                )
                .subcommand(
                    Command::new("smtp")
                        .subcommand(
                            Command::new("set")
                                .arg(Arg::new("host").long("host"))
                                .arg(Arg::new("port").long("port"))
                                .arg(Arg::new("user").long("user"))
                                .arg(Arg::new("pass").long("pass"))
                                .arg(Arg::new("from").long("from"))
                                .arg(Arg::new("hour").long("hour").help("Scheduled send hour (cron hint)"))
                                .arg(Arg::new("minute").long("minute")),
                        )
                        .subcommand(Command::new("show")),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Bulk import from header-mapped CSV")
                .subcommand(
                    Command::new("vouchers")
                        .arg(as_arg())
                        .arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("contracts")
                        .arg(as_arg())
                        .arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export to CSV or JSON")
                .subcommand(
                    Command::new("vouchers")
                        .arg(as_arg())
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("contracts")
                        .arg(as_arg())
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("template")
                        .arg(Arg::new("kind").long("kind").value_name("vouchers|contracts").required(true))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
}
