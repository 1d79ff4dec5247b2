use ar_overlay::{SessionBuilder, SessionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Session Configuration Serialization Demo");
    println!("===========================================\n");

    // Demo 1: Create configurations
    println!("📋 Demo 1: Creating Configurations");

    let still = SessionConfig::still_image();
    let live = SessionConfig::live_video().with_metadata("Kiosk Camera", "Live overlay at 30 fps");
    let custom = SessionBuilder::new()
        .min_match_count(25)
        .ratio(0.65)
        .checks(96)
        .config()
        .clone()
        .with_metadata("Custom", "Tighter ratio test and a deeper search");

    println!("   • {}", still.summary());
    println!("   • {}", live.summary());
    println!("   • {}", custom.summary());

    // Demo 2: JSON
    println!("\n📄 Demo 2: JSON Serialization");
    let json = live.to_json()?;
    println!("   {}", &json[..200.min(json.len())]);
    still.save_json("still_config.json")?;
    live.save_json("live_config.json")?;
    println!("   ✅ Saved 2 JSON configuration files");

    // Demo 3: TOML
    println!("\n📋 Demo 3: TOML Serialization");
    let toml = custom.to_toml()?;
    println!("   {}", &toml[..300.min(toml.len())]);
    custom.save_toml("custom_config.toml")?;
    println!("   ✅ Saved custom_config.toml");

    // Demo 4: Load and validate
    println!("\n🔍 Demo 4: Loading and Validation");
    let loaded_live = SessionConfig::load("live_config.json")?;
    let loaded_custom = SessionConfig::load("custom_config.toml")?;
    assert_eq!(loaded_live, live);
    assert_eq!(loaded_custom, custom);
    println!("   • From JSON: {}", loaded_live.summary());
    println!("   • From TOML: {}", loaded_custom.summary());

    // Demo 5: Invalid configs are rejected on load
    println!("\n🚫 Demo 5: Rejecting Invalid Configurations");
    let mut broken = still.clone();
    broken.core.ratio = 1.5;
    match SessionConfig::from_json(&serde_json::to_string(&broken)?) {
        Ok(_) => println!("   ⚠️  Invalid config was accepted"),
        Err(e) => println!("   ✅ Rejected: {}", e),
    }

    for f in ["still_config.json", "live_config.json", "custom_config.toml"] {
        std::fs::remove_file(f)?;
    }
    println!("\n🎉 Configuration demo complete");
    Ok(())
}
