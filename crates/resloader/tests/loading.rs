use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use resloader::{
    DeletionStrategy, Error, LibraryLoader, LoadMode, Loaded, LoaderConfig, Mode, RegisterError, Registrar,
    ResourceLoader, StaticCodeSource,
};
use tempfile::TempDir;

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).unwrap().to_string()
}

/// Every file below `root`, keyed by its relative path.
fn listing(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.insert(path.strip_prefix(root).unwrap().to_path_buf(), fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

struct Fixture {
    _dirs: Vec<TempDir>,
    loader: ResourceLoader,
}

fn loader_for(location: String, scratch: TempDir, keep: Vec<TempDir>, deletion: DeletionStrategy) -> Fixture {
    let loader = ResourceLoader::new(
        LoaderConfig::default()
            .code_source(StaticCodeSource::new(location))
            .temp_parent(scratch.path())
            .deletion(deletion),
    );
    let mut dirs = keep;
    dirs.push(scratch);
    Fixture { _dirs: dirs, loader }
}

/// An application jar with natives at the top level and a nested library jar.
fn packaged(deletion: DeletionStrategy) -> Fixture {
    let dir = TempDir::new().unwrap();
    let lib = zip_bytes(&[("mac/libsodium.dylib", b"macho"), ("linux/libsodium.so", b"elf")]);
    let app = zip_bytes(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
        ("test1.txt", b"hello"),
        ("folder2/a.txt", b"a"),
        ("folder2/deeper/b.txt", b"b"),
        ("BOOT-INF/lib/lazysodium.jar", &lib),
    ]);
    let jar = dir.path().join("app with spaces.jar");
    fs::write(&jar, app).unwrap();
    loader_for(format!("jar:{}!/", file_url(&jar)), TempDir::new().unwrap(), vec![dir], deletion)
}

#[test]
fn packaged_file_round_trips() {
    let fixture = packaged(DeletionStrategy::Immediate);
    let resource = fixture.loader.load("test1.txt").unwrap();
    assert!(resource.is_file());
    assert_eq!(fs::read(resource.path()).unwrap(), b"hello");
}

#[test]
fn packaged_directory_matches_subtree() {
    let fixture = packaged(DeletionStrategy::Immediate);
    let resource = fixture.loader.resolve("/folder2").unwrap();
    assert!(resource.is_dir());

    let expected = BTreeMap::from([
        (PathBuf::from("a.txt"), b"a".to_vec()),
        (Path::new("deeper").join("b.txt"), b"b".to_vec()),
    ]);
    assert_eq!(listing(resource.path()), expected);
}

#[test]
fn packaged_nested_jar_entry() {
    let fixture = packaged(DeletionStrategy::Immediate);
    let resource = fixture.loader.resolve("BOOT-INF/lib/lazysodium.jar/linux/libsodium.so").unwrap();
    assert_eq!(fs::read(resource.path()).unwrap(), b"elf");
    assert_eq!(resource.path().file_name().unwrap(), "libsodium.so");
}

#[test]
fn code_inside_nested_jar_resolves_relative_to_it() {
    let dir = TempDir::new().unwrap();
    let lib = zip_bytes(&[("mac/libsodium.dylib", b"macho")]);
    let app = zip_bytes(&[("BOOT-INF/lib/lazysodium.jar", &lib)]);
    let jar = dir.path().join("app-0.0.1-SNAPSHOT.jar");
    fs::write(&jar, app).unwrap();

    let location = format!("jar:{}!/BOOT-INF/lib/lazysodium.jar!/", file_url(&jar));
    let fixture = loader_for(location, TempDir::new().unwrap(), vec![dir], DeletionStrategy::Immediate);
    let resource = fixture.loader.resolve("mac/libsodium.dylib").unwrap();
    assert_eq!(fs::read(resource.path()).unwrap(), b"macho");
}

#[test]
fn loose_directory_matches_subtree() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("folder2/deeper")).unwrap();
    fs::write(root.path().join("folder2/a.txt"), b"a").unwrap();
    fs::write(root.path().join("folder2/deeper/b.txt"), b"b").unwrap();

    let location = root.path().to_string_lossy().into_owned();
    let source = root.path().join("folder2");
    let fixture = loader_for(location, TempDir::new().unwrap(), vec![root], DeletionStrategy::Immediate);
    let resource = fixture.loader.resolve("folder2").unwrap();
    assert!(resource.is_dir());
    assert_eq!(listing(resource.path()), listing(&source));
}

#[test]
fn loose_root_reaches_into_nested_archive() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("libs")).unwrap();
    let lib = zip_bytes(&[("mac/libsodium.dylib", b"macho")]);
    let inner = zip_bytes(&[("data.bin", b"payload"), ("lazysodium.jar", &lib)]);
    fs::write(root.path().join("libs/inner.jar"), inner).unwrap();

    let location = root.path().to_string_lossy().into_owned();
    let fixture = loader_for(location, TempDir::new().unwrap(), vec![root], DeletionStrategy::Immediate);

    let data = fixture.loader.resolve("libs/inner.jar/data.bin").unwrap();
    assert!(data.is_file());
    assert_eq!(fs::read(data.path()).unwrap(), b"payload");

    let dylib = fixture.loader.resolve("libs/inner.jar/lazysodium.jar/mac/libsodium.dylib").unwrap();
    assert_eq!(fs::read(dylib.path()).unwrap(), b"macho");

    let err = fixture.loader.resolve("libs/inner.jar/missing.bin").unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn failed_subtree_extraction_leaves_temp_tree_clean() {
    let dir = TempDir::new().unwrap();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("folder2/a.txt", options).unwrap();
    writer.write_all(b"intact").unwrap();
    writer.start_file("folder2/b.txt", options).unwrap();
    writer.write_all(b"will-fail-its-crc").unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();
    let at = bytes.windows(17).position(|w| w == b"will-fail-its-crc").unwrap();
    bytes[at] ^= 0xFF;
    let jar = dir.path().join("app.jar");
    fs::write(&jar, bytes).unwrap();

    let scratch = TempDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let fixture = loader_for(file_url(&jar), scratch, vec![dir], DeletionStrategy::Immediate);

    let err = fixture.loader.resolve("folder2").unwrap_err();
    assert!(matches!(err, Error::Archive(_)), "{err}");
    assert!(listing(&scratch_path).is_empty());
    assert!(fixture.loader.cache().is_empty());
}

#[test]
fn concurrent_resolves_agree() {
    let fixture = Arc::new(packaged(DeletionStrategy::Immediate));
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let fixture = Arc::clone(&fixture);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                fixture.loader.resolve("test1.txt").unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(fixture.loader.cache().len(), 1);
}

#[derive(Debug, Default)]
struct FileRegistrar {
    calls: AtomicUsize,
}

impl Registrar for FileRegistrar {
    type Consumer = &'static str;

    fn register(&self, _consumer: &&'static str, library: &str) -> Result<(), RegisterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if Path::new(library).is_file() {
            Ok(())
        } else {
            Err(format!("no such library: {library}").into())
        }
    }
}

#[test]
fn bundled_library_from_nested_jar() {
    let fixture = packaged(DeletionStrategy::Immediate);
    let resources = Arc::new(fixture.loader);
    let loader = LibraryLoader::new(Arc::clone(&resources), FileRegistrar::default());

    let loaded = loader
        .load_preset(
            Mode::PreferSystem,
            "sodium-not-installed",
            "BOOT-INF/lib/lazysodium.jar/mac/libsodium.dylib",
            &["Sodium"],
        )
        .unwrap();
    let Loaded::Bundled { path } = loaded else {
        panic!("expected the bundled copy");
    };
    assert!(path.ends_with("libsodium.dylib"));
    assert_eq!(loader.registrar().calls.load(Ordering::SeqCst), 2);

    // Immediate deletion removed the file and forgot it, so a reload extracts again.
    assert!(!path.exists());
    assert!(resources.cache().is_empty());
    assert!(loader.load_bundled("BOOT-INF/lib/lazysodium.jar/mac/libsodium.dylib", &["Sodium"]).is_ok());
}

#[test]
fn exhausted_plan_is_distinguishable() {
    let fixture = packaged(DeletionStrategy::DeferToExit);
    let loader = LibraryLoader::new(Arc::new(fixture.loader), FileRegistrar::default());

    let plan = [LoadMode::system("sodium"), LoadMode::bundled("folder2")];
    let err = loader.load(&plan, &["Sodium"]).unwrap_err();
    assert_eq!(err.attempts(), plan.len());
    let Error::Exhausted { failures } = err else {
        panic!("expected exhaustion");
    };
    assert!(matches!(*failures[1].error, Error::NotAFile(_)));
    assert_eq!(loader.registrar().calls.load(Ordering::SeqCst), 1);
}
