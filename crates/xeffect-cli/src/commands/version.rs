pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let response = xeffect_core::service::version_response();
    println!("{}", response.body);
    Ok(())
}
