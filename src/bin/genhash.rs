//! 为管理员账户生成密码哈希，输出可直接写入 `admins.password_hash`

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: genhash <password>");
    std::process::exit(1);
}

fn main() {
    let mut args = std::env::args().skip(1); // 跳过程序名

    let password = args.next().unwrap_or_else(|| {
        eprintln!("Missing <password>");
        print_usage_and_exit();
    });

    if args.next().is_some() {
        eprintln!("Too many arguments provided.");
        print_usage_and_exit();
    }

    if password.is_empty() {
        eprintln!("Password must not be empty.");
        print_usage_and_exit();
    }

    match devlog::auth::hash_password(&password) {
        Ok(hash) => println!("{hash}"),
        Err(e) => {
            eprintln!("Failed to hash password: {e}");
            std::process::exit(1);
        }
    }
}
