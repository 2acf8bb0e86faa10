use modchain::{
    chain::{build_mod_chain, Context, CycloParams, ModChainParams},
    sdk::api::Platform,
    sizes::{read_binary, read_text, write_binary, write_text},
};
use std::f64::consts::LN_2;

#[test]
fn build_query_serialize() {
    set_up_logs();

    let cyclo = CycloParams::new(16384, 2, 1).unwrap();
    let mut context = Context::new(cyclo, Platform::native()).unwrap();
    let params = ModChainParams {
        n_bits: 119,
        n_dgts: 2,
        resolution: 3,
    };
    let table = build_mod_chain(&mut context, &params, None).unwrap();

    // modulus-switch down to ~60 bits keeping as much of Q as possible
    let from = context.ctxt_primes().clone();
    let chosen = table
        .get_set_for_size(55.0 * LN_2, 62.0 * LN_2, &from, false)
        .unwrap();
    let chosen_log = context.log_of_product(&chosen).unwrap();
    assert!(55.0 * LN_2 <= chosen_log && chosen_log <= 62.0 * LN_2);
    // the best candidate keeps one of the two ctxt primes
    assert_eq!(from.diff_card(&chosen), 1);

    // key-switching sizes one set against ctxt primes and one against digits
    let digit = &context.digits()[0];
    let chosen = table
        .get_set_for_size2(30.0 * LN_2, 50.0 * LN_2, &from, digit, false)
        .unwrap();
    let chosen_log = context.log_of_product(&chosen).unwrap();
    assert!(30.0 * LN_2 <= chosen_log && chosen_log <= 50.0 * LN_2);

    // both stream framings restore the table entry-for-entry
    let mut text = Vec::new();
    write_text(&mut text, &table).unwrap();
    assert_eq!(read_text(&mut text.as_slice()).unwrap(), table);

    let mut binary = Vec::new();
    write_binary(&mut binary, &table).unwrap();
    assert_eq!(read_binary(&mut binary.as_slice()).unwrap(), table);
}

fn set_up_logs() {
    // set up an event subscriber for logs
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
