use super::CaseInsensitiveMap;

#[test]
fn get_should_ignore_key_casing() {
    let mut map = CaseInsensitiveMap::new();
    map.put("NamespaceA", 1);

    assert_eq!(map.get("namespacea"), Some(&1));
    assert_eq!(map.get("NAMESPACEA"), Some(&1));
    assert_eq!(map.get("NamespaceA"), Some(&1));
    assert!(map.contains_key("nAmEsPaCeA"));
}

#[test]
fn put_should_replace_entry_written_with_other_casing() {
    let mut map = CaseInsensitiveMap::new();
    assert_eq!(map.put("FX.apollo", "first"), None);
    assert_eq!(map.put("fx.Apollo", "second"), Some("first"));

    assert_eq!(map.len(), 1);
    assert_eq!(map.get("fx.apollo"), Some(&"second"));
}

#[test]
fn remove_should_ignore_key_casing() {
    let mut map = CaseInsensitiveMap::new();
    map.put("Application", 7);

    assert_eq!(map.remove("APPLICATION"), Some(7));
    assert!(map.is_empty());
    assert_eq!(map.get("application"), None);
}

#[test]
fn folding_should_be_ascii_only() {
    let mut map = CaseInsensitiveMap::new();
    map.put("İstanbul", 1);

    // Non-ASCII letters are kept verbatim, so a locale-specific fold never matches
    assert_eq!(map.get("i̇stanbul"), None);
    assert_eq!(map.get("İSTANBUL"), Some(&1));
}

#[test]
fn get_mut_should_update_in_place() {
    let mut map = CaseInsensitiveMap::new();
    map.put("ns", vec![1]);
    map.get_mut("NS").unwrap().push(2);

    assert_eq!(map.get("ns"), Some(&vec![1, 2]));
}
