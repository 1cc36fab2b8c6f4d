//! 生成 bcrypt 密码哈希，用于手工初始化管理员账号
//!
//! 注册接口只会创建普通用户，管理员需要直接写入 users 表：
//! `cargo run --bin hash_password -- --cost 12 'S3cretAdmin'`

use clap::Parser;

use ecommerce_api_rust::auth::password::hash_password;
use ecommerce_api_rust::shared::utils::validation::is_strong_password;

#[derive(Debug, Parser)]
#[command(name = "hash_password", about = "生成 bcrypt 密码哈希")]
struct Args {
    /// 需要哈希的密码，可以一次传多个
    #[arg(required = true)]
    passwords: Vec<String>,

    /// bcrypt cost（4-31）
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
    cost: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    for password in &args.passwords {
        if !is_strong_password(password) {
            eprintln!("⚠️ 密码强度不足（至少8位，包含字母和数字）: {}", password);
        }

        let hashed = hash_password(password, args.cost)?;
        println!("{} -> {}", password, hashed);
    }

    Ok(())
}
