use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        http_store: { feature = "http-store" },
    }
}
