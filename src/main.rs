fn main() {
    healthpay_lib::run()
}
