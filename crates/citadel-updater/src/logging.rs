#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {{
        print!($($arg)*);
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }};
}

#[macro_export]
macro_rules! status {
    ($code:expr) => {{
        let ret = $code;
        match &ret {
            Ok(_) => println!("{}", "ok".green()),
            Err(_) => println!("{}", "failed".red()),
        }
        ret
    }};
}
