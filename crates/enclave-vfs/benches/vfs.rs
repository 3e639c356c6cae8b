use criterion::{Criterion, black_box, criterion_group, criterion_main};
use enclave_vfs::{MemoryVfs, Vfs, walk};

fn populated(dirs: usize, files: usize) -> MemoryVfs {
    let mut vfs = MemoryVfs::new();
    for d in 0..dirs {
        let dir = format!("/dir_{d}");
        vfs.mkdir(&dir).unwrap();
        for f in 0..files {
            vfs.write(&format!("{dir}/file_{f}.txt"), b"line one\nline two\n")
                .unwrap();
        }
    }
    vfs
}

fn bench_write_read(c: &mut Criterion) {
    c.bench_function("memory_write_read_1k", |b| {
        b.iter(|| {
            let mut vfs = MemoryVfs::new();
            for i in 0..1000 {
                let path = format!("/f{i}");
                vfs.write(&path, b"payload").unwrap();
                black_box(vfs.read(&path).unwrap());
            }
        })
    });
}

fn bench_readdir(c: &mut Criterion) {
    let vfs = populated(10, 200);
    c.bench_function("memory_readdir_200", |b| {
        b.iter(|| black_box(vfs.readdir("/dir_5").unwrap()))
    });
}

fn bench_walk(c: &mut Criterion) {
    let vfs = populated(20, 50);
    c.bench_function("memory_walk_1k", |b| {
        b.iter(|| black_box(walk(&vfs, "/").unwrap()))
    });
}

criterion_group!(benches, bench_write_read, bench_readdir, bench_walk);
criterion_main!(benches);
