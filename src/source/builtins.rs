//! Framework type catalogue.
//!
//! Sources are analysed without compiled references, so the base class
//! library types the rules care about are declared here: `IDisposable`,
//! the common disposable framework types, the generic collections and the
//! factory methods that hand out disposables.
//!
//! Entries use a compact C#-like notation:
//!
//! ```text
//! class System.IO.MemoryStream : System.IO.Stream
//!     byte[] ToArray()          method
//!     long Length               property
//!     T this[int]               indexer
//!     static FileStream OpenRead(string)
//! ```

use lazy_static::lazy_static;

use super::types::{DefOrigin, MemberDef, MemberKind, ParamDef, TypeDef, TypeHandle, TypeKind};

struct Entry {
    decl: &'static str,
    members: &'static [&'static str],
}

const PREDEFINED: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "long", "ulong",
    "object", "short", "ushort", "string", "void", "nint", "nuint", "dynamic",
];

pub fn is_predefined(name: &str) -> bool {
    PREDEFINED.contains(&name)
}

const CATALOG: &[Entry] = &[
    // Core
    Entry { decl: "interface System.IDisposable", members: &["void Dispose()"] },
    Entry { decl: "interface System.IAsyncDisposable", members: &[] },
    Entry { decl: "class System.Object", members: &["string ToString()", "int GetHashCode()"] },
    Entry { decl: "class System.Exception", members: &["string Message"] },
    Entry { decl: "class System.Type", members: &["string Name", "string FullName"] },
    Entry { decl: "delegate System.Predicate<T>", members: &[] },
    Entry { decl: "delegate System.Func<TResult>", members: &[] },
    Entry { decl: "delegate System.Action", members: &[] },
    Entry { decl: "class System.Lazy<T>", members: &["T Value"] },
    Entry {
        decl: "static class System.Activator",
        members: &["static object CreateInstance(System.Type)"],
    },

    // Tasks
    Entry { decl: "class System.Threading.Tasks.Task", members: &["void Wait()"] },
    Entry {
        decl: "class System.Threading.Tasks.Task<TResult> : System.Threading.Tasks.Task",
        members: &["TResult Result"],
    },
    Entry { decl: "struct System.Threading.Tasks.ValueTask<TResult>", members: &["TResult Result"] },

    // IO
    Entry { decl: "enum System.IO.FileMode", members: &[] },
    Entry { decl: "enum System.IO.FileAccess", members: &[] },
    Entry {
        decl: "abstract class System.IO.Stream : System.IDisposable, System.IAsyncDisposable",
        members: &[
            "void Close()",
            "void Dispose()",
            "void Flush()",
            "int Read(byte[], int, int)",
            "void Write(byte[], int, int)",
            "void CopyTo(System.IO.Stream)",
            "long Length",
            "long Position",
        ],
    },
    Entry {
        decl: "class System.IO.FileStream : System.IO.Stream",
        members: &["string Name"],
    },
    Entry {
        decl: "class System.IO.MemoryStream : System.IO.Stream",
        members: &["byte[] ToArray()"],
    },
    Entry { decl: "class System.IO.BufferedStream : System.IO.Stream", members: &[] },
    Entry {
        decl: "class System.IO.Compression.GZipStream : System.IO.Stream",
        members: &[],
    },
    Entry {
        decl: "class System.IO.Compression.DeflateStream : System.IO.Stream",
        members: &[],
    },
    Entry {
        decl: "class System.IO.Compression.ZipArchive : System.IDisposable",
        members: &[],
    },
    Entry {
        decl: "abstract class System.IO.TextReader : System.IDisposable",
        members: &["string ReadToEnd()", "string ReadLine()", "void Close()"],
    },
    Entry {
        decl: "class System.IO.StreamReader : System.IO.TextReader",
        members: &["System.IO.Stream BaseStream"],
    },
    Entry { decl: "class System.IO.StringReader : System.IO.TextReader", members: &[] },
    Entry {
        decl: "abstract class System.IO.TextWriter : System.IDisposable, System.IAsyncDisposable",
        members: &["void Write(string)", "void WriteLine(string)", "void Flush()", "void Close()"],
    },
    Entry {
        decl: "class System.IO.StreamWriter : System.IO.TextWriter",
        members: &["System.IO.Stream BaseStream"],
    },
    Entry { decl: "class System.IO.StringWriter : System.IO.TextWriter", members: &[] },
    Entry {
        decl: "class System.IO.BinaryReader : System.IDisposable",
        members: &["System.IO.Stream BaseStream", "void Close()"],
    },
    Entry {
        decl: "class System.IO.BinaryWriter : System.IDisposable",
        members: &["System.IO.Stream BaseStream", "void Close()"],
    },
    Entry {
        decl: "class System.IO.FileSystemWatcher : System.ComponentModel.Component",
        members: &[],
    },
    Entry {
        decl: "static class System.IO.File",
        members: &[
            "static System.IO.FileStream OpenRead(string)",
            "static System.IO.FileStream OpenWrite(string)",
            "static System.IO.FileStream Create(string)",
            "static System.IO.FileStream Open(string, System.IO.FileMode)",
            "static System.IO.StreamReader OpenText(string)",
            "static System.IO.StreamWriter CreateText(string)",
            "static System.IO.StreamWriter AppendText(string)",
            "static string ReadAllText(string)",
            "static void WriteAllText(string, string)",
            "static bool Exists(string)",
            "static void Delete(string)",
        ],
    },

    // Networking
    Entry {
        decl: "class System.Net.Http.HttpClient : System.Net.Http.HttpMessageInvoker",
        members: &[
            "System.Threading.Tasks.Task<System.Net.Http.HttpResponseMessage> GetAsync(string)",
            "System.Threading.Tasks.Task<string> GetStringAsync(string)",
            "System.Threading.Tasks.Task<System.Net.Http.HttpResponseMessage> PostAsync(string, System.Net.Http.HttpContent)",
            "System.Threading.Tasks.Task<System.Net.Http.HttpResponseMessage> SendAsync(System.Net.Http.HttpRequestMessage)",
        ],
    },
    Entry {
        decl: "class System.Net.Http.HttpMessageInvoker : System.IDisposable",
        members: &[],
    },
    Entry {
        decl: "class System.Net.Http.HttpResponseMessage : System.IDisposable",
        members: &["System.Net.Http.HttpContent Content", "bool IsSuccessStatusCode"],
    },
    Entry {
        decl: "class System.Net.Http.HttpRequestMessage : System.IDisposable",
        members: &["System.Net.Http.HttpContent Content"],
    },
    Entry {
        decl: "abstract class System.Net.Http.HttpContent : System.IDisposable",
        members: &["System.Threading.Tasks.Task<string> ReadAsStringAsync()"],
    },
    Entry {
        decl: "class System.Net.Http.StringContent : System.Net.Http.HttpContent",
        members: &[],
    },
    Entry {
        decl: "class System.Net.WebClient : System.ComponentModel.Component",
        members: &["string DownloadString(string)"],
    },
    Entry {
        decl: "abstract class System.Net.WebResponse : System.IDisposable",
        members: &["System.IO.Stream GetResponseStream()"],
    },
    Entry {
        decl: "class System.Net.Sockets.Socket : System.IDisposable",
        members: &["void Close()", "System.Net.Sockets.Socket Accept()"],
    },
    Entry {
        decl: "class System.Net.Sockets.TcpClient : System.IDisposable",
        members: &["System.Net.Sockets.NetworkStream GetStream()", "void Close()"],
    },
    Entry {
        decl: "class System.Net.Sockets.TcpListener",
        members: &[
            "System.Net.Sockets.TcpClient AcceptTcpClient()",
            "System.Net.Sockets.Socket AcceptSocket()",
            "void Start()",
            "void Stop()",
        ],
    },
    Entry {
        decl: "class System.Net.Sockets.UdpClient : System.IDisposable",
        members: &["void Close()"],
    },
    Entry {
        decl: "class System.Net.Sockets.NetworkStream : System.IO.Stream",
        members: &[],
    },

    // Threading
    Entry {
        decl: "class System.Threading.Timer : System.IDisposable",
        members: &["bool Change(int, int)"],
    },
    Entry {
        decl: "class System.Timers.Timer : System.ComponentModel.Component",
        members: &["void Start()", "void Stop()"],
    },
    Entry {
        decl: "class System.Threading.CancellationTokenSource : System.IDisposable",
        members: &["void Cancel()", "static System.Threading.CancellationTokenSource CreateLinkedTokenSource(System.Threading.CancellationToken, System.Threading.CancellationToken)"],
    },
    Entry { decl: "struct System.Threading.CancellationToken", members: &[] },
    Entry {
        decl: "class System.Threading.SemaphoreSlim : System.IDisposable",
        members: &["void Wait()", "int Release()"],
    },
    Entry {
        decl: "abstract class System.Threading.WaitHandle : System.IDisposable",
        members: &["bool WaitOne()", "void Close()"],
    },
    Entry {
        decl: "class System.Threading.EventWaitHandle : System.Threading.WaitHandle",
        members: &["bool Set()", "bool Reset()"],
    },
    Entry {
        decl: "class System.Threading.ManualResetEvent : System.Threading.EventWaitHandle",
        members: &[],
    },
    Entry {
        decl: "class System.Threading.AutoResetEvent : System.Threading.EventWaitHandle",
        members: &[],
    },
    Entry {
        decl: "class System.Threading.Mutex : System.Threading.WaitHandle",
        members: &["void ReleaseMutex()"],
    },
    Entry {
        decl: "class System.Threading.ReaderWriterLockSlim : System.IDisposable",
        members: &[],
    },

    // Process, components, transactions
    Entry {
        decl: "class System.ComponentModel.Component : System.IDisposable",
        members: &[],
    },
    Entry {
        decl: "class System.Diagnostics.Process : System.ComponentModel.Component",
        members: &[
            "static System.Diagnostics.Process Start(string)",
            "static System.Diagnostics.Process GetCurrentProcess()",
            "static System.Diagnostics.Process GetProcessById(int)",
            "void WaitForExit()",
            "void Kill()",
        ],
    },
    Entry {
        decl: "class System.Transactions.TransactionScope : System.IDisposable",
        members: &["void Complete()"],
    },
    Entry {
        decl: "abstract class System.Runtime.InteropServices.SafeHandle : System.IDisposable",
        members: &["void Close()"],
    },
    Entry {
        decl: "class Microsoft.Win32.RegistryKey : System.IDisposable",
        members: &["Microsoft.Win32.RegistryKey OpenSubKey(string)", "void Close()"],
    },

    // Data access
    Entry {
        decl: "interface System.Data.IDbConnection : System.IDisposable",
        members: &["void Open()", "void Close()", "System.Data.IDbCommand CreateCommand()"],
    },
    Entry {
        decl: "interface System.Data.IDbCommand : System.IDisposable",
        members: &["System.Data.IDataReader ExecuteReader()", "int ExecuteNonQuery()"],
    },
    Entry {
        decl: "interface System.Data.IDataReader : System.IDisposable",
        members: &["bool Read()", "void Close()"],
    },
    Entry {
        decl: "abstract class System.Data.Common.DbConnection : System.Data.IDbConnection",
        members: &["System.Data.Common.DbCommand CreateCommand()"],
    },
    Entry {
        decl: "abstract class System.Data.Common.DbCommand : System.Data.IDbCommand",
        members: &["System.Data.Common.DbDataReader ExecuteReader()"],
    },
    Entry {
        decl: "abstract class System.Data.Common.DbDataReader : System.Data.IDataReader",
        members: &[],
    },
    Entry {
        decl: "class System.Data.SqlClient.SqlConnection : System.Data.Common.DbConnection",
        members: &["System.Data.SqlClient.SqlCommand CreateCommand()"],
    },
    Entry {
        decl: "class System.Data.SqlClient.SqlCommand : System.Data.Common.DbCommand",
        members: &["System.Data.SqlClient.SqlDataReader ExecuteReader()"],
    },
    Entry {
        decl: "class System.Data.SqlClient.SqlDataReader : System.Data.Common.DbDataReader",
        members: &[],
    },
    Entry {
        decl: "class Microsoft.Data.SqlClient.SqlConnection : System.Data.Common.DbConnection",
        members: &["Microsoft.Data.SqlClient.SqlCommand CreateCommand()"],
    },
    Entry {
        decl: "class Microsoft.Data.SqlClient.SqlCommand : System.Data.Common.DbCommand",
        members: &[],
    },

    // Cryptography and drawing
    Entry {
        decl: "abstract class System.Security.Cryptography.HashAlgorithm : System.IDisposable",
        members: &["byte[] ComputeHash(byte[])"],
    },
    Entry {
        decl: "abstract class System.Security.Cryptography.SHA256 : System.Security.Cryptography.HashAlgorithm",
        members: &["static System.Security.Cryptography.SHA256 Create()"],
    },
    Entry {
        decl: "abstract class System.Security.Cryptography.MD5 : System.Security.Cryptography.HashAlgorithm",
        members: &["static System.Security.Cryptography.MD5 Create()"],
    },
    Entry {
        decl: "abstract class System.Drawing.Image : System.IDisposable",
        members: &["static System.Drawing.Image FromFile(string)"],
    },
    Entry { decl: "class System.Drawing.Bitmap : System.Drawing.Image", members: &[] },
    Entry {
        decl: "class System.Drawing.Graphics : System.IDisposable",
        members: &["static System.Drawing.Graphics FromImage(System.Drawing.Image)"],
    },
    Entry { decl: "class System.Drawing.Font : System.IDisposable", members: &[] },
    Entry { decl: "class System.Drawing.Pen : System.IDisposable", members: &[] },
    Entry { decl: "abstract class System.Drawing.Brush : System.IDisposable", members: &[] },
    Entry { decl: "class System.Drawing.SolidBrush : System.Drawing.Brush", members: &[] },

    // Collections
    Entry { decl: "interface System.Collections.IEnumerable", members: &[] },
    Entry {
        decl: "interface System.Collections.Generic.IEnumerable<T> : System.Collections.IEnumerable",
        members: &[],
    },
    Entry {
        decl: "interface System.Collections.Generic.IEnumerator<T> : System.IDisposable",
        members: &["T Current", "bool MoveNext()"],
    },
    Entry {
        decl: "interface System.Collections.Generic.ICollection<T> : System.Collections.Generic.IEnumerable<T>",
        members: &["int Count", "void Add(T)", "bool Remove(T)", "void Clear()", "bool Contains(T)"],
    },
    Entry {
        decl: "interface System.Collections.Generic.IList<T> : System.Collections.Generic.ICollection<T>",
        members: &["T this[int]", "void Insert(int, T)", "void RemoveAt(int)", "int IndexOf(T)"],
    },
    Entry {
        decl: "interface System.Collections.Generic.IReadOnlyCollection<T> : System.Collections.Generic.IEnumerable<T>",
        members: &["int Count"],
    },
    Entry {
        decl: "interface System.Collections.Generic.IReadOnlyList<T> : System.Collections.Generic.IReadOnlyCollection<T>",
        members: &["T this[int]"],
    },
    Entry {
        decl: "class System.Collections.Generic.List<T> : System.Collections.Generic.IList<T>, System.Collections.Generic.IReadOnlyList<T>",
        members: &[
            "int Count",
            "T this[int]",
            "void Add(T)",
            "void AddRange(System.Collections.Generic.IEnumerable<T>)",
            "void Insert(int, T)",
            "bool Remove(T)",
            "void RemoveAt(int)",
            "int RemoveAll(System.Predicate<T>)",
            "void RemoveRange(int, int)",
            "void Clear()",
            "bool Contains(T)",
            "T Find(System.Predicate<T>)",
            "int IndexOf(T)",
            "T[] ToArray()",
        ],
    },
    Entry {
        decl: "struct System.Collections.Generic.KeyValuePair<TKey, TValue>",
        members: &["TKey Key", "TValue Value"],
    },
    Entry {
        decl: "interface System.Collections.Generic.IDictionary<TKey, TValue> : System.Collections.Generic.ICollection<System.Collections.Generic.KeyValuePair<TKey, TValue>>",
        members: &[
            "TValue this[TKey]",
            "void Add(TKey, TValue)",
            "bool Remove(TKey)",
            "bool ContainsKey(TKey)",
            "bool TryGetValue(TKey, out TValue)",
            "System.Collections.Generic.ICollection<TKey> Keys",
            "System.Collections.Generic.ICollection<TValue> Values",
        ],
    },
    Entry {
        decl: "interface System.Collections.Generic.IReadOnlyDictionary<TKey, TValue> : System.Collections.Generic.IReadOnlyCollection<System.Collections.Generic.KeyValuePair<TKey, TValue>>",
        members: &["TValue this[TKey]", "bool ContainsKey(TKey)"],
    },
    Entry {
        decl: "class System.Collections.Generic.Dictionary<TKey, TValue> : System.Collections.Generic.IDictionary<TKey, TValue>, System.Collections.Generic.IReadOnlyDictionary<TKey, TValue>",
        members: &[
            "int Count",
            "TValue this[TKey]",
            "void Add(TKey, TValue)",
            "bool TryAdd(TKey, TValue)",
            "bool Remove(TKey)",
            "bool ContainsKey(TKey)",
            "bool TryGetValue(TKey, out TValue)",
            "void Clear()",
            "System.Collections.Generic.ICollection<TKey> Keys",
            "System.Collections.Generic.ICollection<TValue> Values",
        ],
    },
    Entry {
        decl: "class System.Collections.Generic.HashSet<T> : System.Collections.Generic.ICollection<T>",
        members: &["bool Add(T)", "bool Remove(T)", "int RemoveWhere(System.Predicate<T>)", "void Clear()"],
    },
    Entry {
        decl: "class System.Collections.Generic.Queue<T> : System.Collections.Generic.IEnumerable<T>, System.Collections.Generic.IReadOnlyCollection<T>",
        members: &["void Enqueue(T)", "T Dequeue()", "T Peek()", "int Count", "void Clear()"],
    },
    Entry {
        decl: "class System.Collections.Generic.Stack<T> : System.Collections.Generic.IEnumerable<T>, System.Collections.Generic.IReadOnlyCollection<T>",
        members: &["void Push(T)", "T Pop()", "T Peek()", "int Count", "void Clear()"],
    },
    Entry {
        decl: "class System.Collections.Generic.LinkedList<T> : System.Collections.Generic.ICollection<T>",
        members: &["void AddLast(T)", "void AddFirst(T)", "bool Remove(T)"],
    },
    Entry {
        decl: "class System.Collections.ObjectModel.Collection<T> : System.Collections.Generic.IList<T>",
        members: &["int Count", "T this[int]", "void Add(T)", "bool Remove(T)", "void RemoveAt(int)", "void Insert(int, T)", "void Clear()"],
    },
    Entry {
        decl: "class System.Collections.ObjectModel.ObservableCollection<T> : System.Collections.ObjectModel.Collection<T>",
        members: &[],
    },
    Entry {
        decl: "class System.Collections.Concurrent.ConcurrentDictionary<TKey, TValue> : System.Collections.Generic.IDictionary<TKey, TValue>",
        members: &[
            "TValue this[TKey]",
            "bool TryAdd(TKey, TValue)",
            "bool TryRemove(TKey, out TValue)",
            "bool TryGetValue(TKey, out TValue)",
            "TValue GetOrAdd(TKey, TValue)",
            "void Clear()",
        ],
    },
    Entry {
        decl: "class System.Collections.Concurrent.ConcurrentQueue<T> : System.Collections.Generic.IReadOnlyCollection<T>",
        members: &["void Enqueue(T)", "bool TryDequeue(out T)"],
    },
    Entry {
        decl: "class System.Collections.Concurrent.ConcurrentBag<T> : System.Collections.Generic.IReadOnlyCollection<T>",
        members: &["void Add(T)", "bool TryTake(out T)"],
    },
    Entry {
        decl: "class System.Collections.Concurrent.BlockingCollection<T> : System.Collections.Generic.IReadOnlyCollection<T>, System.IDisposable",
        members: &["void Add(T)", "T Take()"],
    },
];

lazy_static! {
    static ref BUILTIN_DEFS: Vec<TypeDef> = CATALOG.iter().filter_map(parse_entry).collect();
}

/// All framework definitions.
pub fn builtin_defs() -> &'static [TypeDef] {
    &BUILTIN_DEFS
}

// -----------------------------------------------------------------------------
// Catalogue notation parsing
// -----------------------------------------------------------------------------

fn parse_entry(entry: &Entry) -> Option<TypeDef> {
    let (head, bases) = match split_top_level(entry.decl, ':').as_slice() {
        [head] => (head.clone(), String::new()),
        [head, bases] => (head.clone(), bases.clone()),
        _ => return None,
    };

    let mut rest = head.trim();
    let mut is_static = false;
    loop {
        if let Some(r) = rest.strip_prefix("static ") {
            is_static = true;
            rest = r.trim_start();
        } else if let Some(r) = rest.strip_prefix("abstract ") {
            rest = r.trim_start();
        } else {
            break;
        }
    }
    let (kind_word, full) = rest.split_once(' ')?;
    let kind = match kind_word {
        "class" => TypeKind::Class,
        "interface" => TypeKind::Interface,
        "struct" => TypeKind::Struct,
        "enum" => TypeKind::Enum,
        "delegate" => TypeKind::Delegate,
        "record" => TypeKind::Record,
        _ => return None,
    };

    let (qualified, type_params) = split_generic(full);
    let (namespace, name) = qualified.rsplit_once('.')?;
    let type_params: Vec<String> = type_params.iter().map(|p| p.trim().to_string()).collect();

    let bases = split_top_level(&bases, ',')
        .iter()
        .filter(|b| !b.trim().is_empty())
        .map(|b| parse_type(b, &type_params))
        .collect();

    let members = entry
        .members
        .iter()
        .filter_map(|m| parse_member(m, &type_params))
        .collect();

    Some(TypeDef {
        namespace: namespace.to_string(),
        name: name.to_string(),
        kind,
        type_params,
        bases,
        members,
        is_static,
        origin: DefOrigin::Builtin,
    })
}

fn parse_member(text: &str, outer_params: &[String]) -> Option<MemberDef> {
    let text = text.trim();
    let (is_static, text) = match text.strip_prefix("static ") {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };

    // Return type ends at the first top-level space.
    let split = top_level_space(text)?;
    let (ret, rest) = (&text[..split], text[split..].trim());

    if let Some(params) = rest.strip_prefix("this[").and_then(|r| r.strip_suffix(']')) {
        return Some(MemberDef {
            name: "this[]".to_string(),
            kind: MemberKind::Indexer,
            ty: Some(parse_type(ret, outer_params)),
            params: parse_params(params, outer_params),
            type_params: Vec::new(),
            is_static,
            is_extension: false,
        });
    }

    match rest.find('(') {
        Some(open) => {
            let (name, method_params) = split_generic(&rest[..open]);
            let mut scope: Vec<String> = outer_params.to_vec();
            scope.extend(method_params.iter().cloned());
            let params = rest[open + 1..].strip_suffix(')')?;
            Some(MemberDef {
                name: name.to_string(),
                kind: MemberKind::Method,
                ty: Some(parse_type(ret, &scope)),
                params: parse_params(params, &scope),
                type_params: method_params,
                is_static,
                is_extension: false,
            })
        }
        None => Some(MemberDef {
            name: rest.to_string(),
            kind: MemberKind::Property,
            ty: Some(parse_type(ret, outer_params)),
            params: Vec::new(),
            type_params: Vec::new(),
            is_static,
            is_extension: false,
        }),
    }
}

fn parse_params(text: &str, scope: &[String]) -> Vec<ParamDef> {
    split_top_level(text, ',')
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, p)| {
            let (optional, p) = match p.split_once(" = ") {
                Some((ty, _)) => (true, ty.trim()),
                None => (false, p),
            };
            let (is_params, bare) = match p.strip_prefix("params ") {
                Some(rest) => (true, rest),
                None => (false, p),
            };
            let bare = ["out ", "ref ", "in "]
                .iter()
                .find_map(|m| bare.strip_prefix(m))
                .unwrap_or(bare);
            ParamDef {
                name: format!("arg{}", i),
                ty: Some(parse_type(bare, scope)),
                display: p.to_string(),
                optional,
                is_params,
            }
        })
        .collect()
}

/// Parse a catalogue type string (`System.Collections.Generic.List<T>`,
/// `byte[]`, `TValue`).
pub(crate) fn parse_type(text: &str, scope: &[String]) -> TypeHandle {
    let text = text.trim();
    if let Some(elem) = text.strip_suffix("[]") {
        return TypeHandle::Array(Box::new(parse_type(elem, scope)));
    }
    if let Some(inner) = text.strip_suffix('?') {
        return parse_type(inner, scope);
    }
    let (base, args) = split_generic(text);
    if args.is_empty() {
        if scope.iter().any(|p| p == base) {
            return TypeHandle::Parameter(base.to_string());
        }
        if is_predefined(base) {
            return TypeHandle::Predefined(base.to_string());
        }
    }
    let args = args.iter().map(|a| parse_type(a, scope)).collect();
    match base.rsplit_once('.') {
        Some((ns, name)) => TypeHandle::named(ns, name, args),
        None => TypeHandle::named("", base, args),
    }
}

/// `Name<A, B>` -> (`Name`, [`A`, `B`]).
fn split_generic(text: &str) -> (&str, Vec<String>) {
    let text = text.trim();
    match (text.find('<'), text.ends_with('>')) {
        (Some(open), true) => {
            let inner = &text[open + 1..text.len() - 1];
            let args = split_top_level(inner, ',')
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            (&text[..open], args)
        }
        _ => (text, Vec::new()),
    }
}

/// Split on `sep` outside of `<>`, `()` and `[]`.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            _ => {}
        }
        if c == sep && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    parts.push(current.trim().to_string());
    parts
}

fn top_level_space(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ' ' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(namespace: &str, name: &str) -> &'static TypeDef {
        builtin_defs()
            .iter()
            .find(|d| d.namespace == namespace && d.name == name)
            .expect("catalogued type")
    }

    #[test]
    fn test_every_entry_parses() {
        assert_eq!(builtin_defs().len(), CATALOG.len());
    }

    #[test]
    fn test_list_definition() {
        let list = def("System.Collections.Generic", "List");
        assert_eq!(list.type_params, vec!["T".to_string()]);
        assert_eq!(list.definition_display(), "System.Collections.Generic.List<T>");
        let remove_at = list
            .members
            .iter()
            .find(|m| m.name == "RemoveAt")
            .expect("RemoveAt");
        assert_eq!(remove_at.params[0].display, "int");
    }

    #[test]
    fn test_dictionary_bases_keep_generic_args() {
        let dict = def("System.Collections.Generic", "Dictionary");
        assert_eq!(dict.bases.len(), 2);
        assert_eq!(
            dict.bases[0].qualified_display(),
            "System.Collections.Generic.IDictionary<TKey, TValue>"
        );
    }

    #[test]
    fn test_static_factory_member() {
        let file = def("System.IO", "File");
        assert!(file.is_static);
        let open = file.members.iter().find(|m| m.name == "OpenRead").expect("OpenRead");
        assert!(open.is_static);
        assert!(open.ty.as_ref().is_some_and(|t| t.is_named("System.IO", "FileStream")));
    }

    #[test]
    fn test_out_parameter_display() {
        let dict = def("System.Collections.Generic", "Dictionary");
        let try_get = dict
            .members
            .iter()
            .find(|m| m.name == "TryGetValue")
            .expect("TryGetValue");
        assert_eq!(try_get.params[1].display, "out TValue");
        assert_eq!(try_get.params[1].ty, Some(TypeHandle::Parameter("TValue".into())));
    }

    #[test]
    fn test_indexer_member() {
        let list = def("System.Collections.Generic", "List");
        let indexer = list.members.iter().find(|m| m.kind == MemberKind::Indexer).expect("indexer");
        assert_eq!(indexer.ty, Some(TypeHandle::Parameter("T".into())));
    }
}
