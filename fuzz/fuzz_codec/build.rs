include!("../../build/config.rs");

fn main() {
    use self::config::Cfgs;

    Cfgs::new().apply();
}
