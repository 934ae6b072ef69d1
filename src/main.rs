use ore_schemes::{
    BcloOpe, CipherSize, ClozOre, ClwwOre, LewiOre, OreScheme, PracticalOre, SchemeError,
};

fn demo<S: OreScheme>(name: &str, scheme: &mut S) -> Result<(), SchemeError> {
    let key = scheme.keygen();

    let low = scheme.encrypt(-42, &key)?;
    let high = scheme.encrypt(100_000, &key)?;

    println!("== {} ==", name);
    println!("compare(-42, 100000) = {:?}", scheme.compare(&low, &high)?);
    println!("decrypt(enc(-42))    = {}", scheme.decrypt(&low, &key)?);
    println!("ciphertext size      = {} bits", low.size_bits());

    let report = scheme.tracker().snapshot();
    for (primitive, calls) in report.primitives() {
        println!(
            "  {:?}: {} direct, {} nested",
            primitive, calls.direct, calls.nested
        );
    }
    for (operation, count) in report.operations() {
        println!("  {:?}: {}", operation, count);
    }
    println!();
    Ok(())
}

fn main() -> Result<(), SchemeError> {
    let mut ope = BcloOpe::new(1);
    let key = ope.keygen();
    println!("OPE key: {}", hex::encode(key.bytes()));
    let ct = ope.encrypt(-42, &key)?;
    println!("OPE ciphertext of -42: {:?}\n", ct);

    demo("BCLO OPE", &mut BcloOpe::new(1))?;
    demo("CLWW ORE", &mut ClwwOre::new(2))?;
    demo("Practical ORE", &mut PracticalOre::new(3))?;
    demo("Lewi-Wu ORE", &mut LewiOre::new(4))?;
    demo("CLOZ ORE", &mut ClozOre::new(5))?;
    Ok(())
}
